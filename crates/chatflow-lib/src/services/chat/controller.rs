// Chat Controller
//
// Process-wide aggregate owning the message store, streaming tracker, and
// permission gate. All mutation goes through the named operations below;
// reads go through accessors. Backend bridge calls are awaited outside the
// component locks, so one conversation's round trip never blocks another's
// state machine.

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::models::{
    BackendEvent, ChatNotification, Message, PermissionRequest, ToolCallStatus,
};

use super::bridge::BackendBridge;
use super::error::{ChatError, ChatResult};
use super::message_store::MessageStore;
use super::permission_gate::{PermissionGate, PermissionGateConfig};
use super::sequencer::sequence;
use super::stream_tracker::{StreamTracker, StreamingState};

/// Text of the synthesized denial notice, one per denied tool call
fn denial_notice(tool_name: &str) -> String {
    format!("Tool `{}` denied by user. Flow cancelled.", tool_name)
}

/// Main chat orchestration controller
pub struct ChatController {
    bridge: Arc<dyn BackendBridge>,
    store: MessageStore,
    tracker: StreamTracker,
    gate: Arc<PermissionGate>,
    notifications: mpsc::UnboundedSender<ChatNotification>,
    active_conversation: RwLock<Option<String>>,
}

impl ChatController {
    /// Create a controller with production gate timings. Returns the
    /// controller and the receiving end of its notification channel.
    pub fn new(
        bridge: Arc<dyn BackendBridge>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ChatNotification>) {
        Self::with_config(bridge, PermissionGateConfig::default())
    }

    /// Create with custom gate timings (tests use short values)
    pub fn with_config(
        bridge: Arc<dyn BackendBridge>,
        config: PermissionGateConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ChatNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            bridge,
            store: MessageStore::new(),
            tracker: StreamTracker::new(),
            gate: Arc::new(PermissionGate::new(config)),
            notifications: tx,
            active_conversation: RwLock::new(None),
        });
        controller.spawn_permission_sweep();
        (controller, rx)
    }

    /// Wire the gate's timeout sweep into the denial path. The consumer task
    /// holds only a weak reference so dropping the controller tears it down.
    fn spawn_permission_sweep(self: &Arc<Self>) {
        let mut overdue = self.gate.start_sweep();
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(message_id) = overdue.recv().await {
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.deny_timed_out(&message_id).await;
            }
        });
    }

    fn notify(&self, notification: ChatNotification) {
        // UI may have dropped its receiver; notifications are best-effort
        let _ = self.notifications.send(notification);
    }

    fn notify_bridge_failure(&self, action: &str, detail: String) {
        log::warn!("Bridge call failed: action={} error={}", action, detail);
        self.notify(ChatNotification::BridgeFailure {
            action: action.to_string(),
            detail,
        });
    }

    // =========================================================================
    // Message Sending
    // =========================================================================

    /// Send a user message and begin streaming the assistant reply.
    ///
    /// On bridge failure nothing is inserted locally and a notification is
    /// raised. Returns the assistant message id on success.
    pub async fn send_message(&self, conversation_id: &str, content: &str) -> ChatResult<String> {
        if self.tracker.state(conversation_id).await != StreamingState::Idle {
            return Err(ChatError::AlreadyStreaming(conversation_id.to_string()));
        }

        let assistant_id = match self.bridge.send_message(conversation_id, content).await {
            Ok(id) => id,
            Err(err) => {
                self.notify_bridge_failure("send_message", err.to_string());
                return Err(err.into());
            }
        };

        self.store
            .upsert(Message::user(
                conversation_id.to_string(),
                content.to_string(),
            ))
            .await;
        self.store
            .upsert(Message::assistant(
                assistant_id.clone(),
                conversation_id.to_string(),
            ))
            .await;

        if let Err(err) = self
            .tracker
            .start_streaming(conversation_id, &assistant_id)
            .await
        {
            // Lost a race with another local sender; programmer condition
            log::warn!("Ignoring start after send: {}", err);
        }
        Ok(assistant_id)
    }

    /// Replace a user message's content and regenerate from that point.
    /// The backend owns truncation of the superseded tail, so local state
    /// is reconciled by refetching the conversation.
    pub async fn edit_and_resend(
        &self,
        conversation_id: &str,
        message_id: &str,
        new_content: &str,
    ) -> ChatResult<String> {
        if self.tracker.state(conversation_id).await != StreamingState::Idle {
            return Err(ChatError::AlreadyStreaming(conversation_id.to_string()));
        }

        let assistant_id = match self
            .bridge
            .edit_and_resend_message(conversation_id, message_id, new_content)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                self.notify_bridge_failure("edit_and_resend_message", err.to_string());
                return Err(err.into());
            }
        };

        self.sync_conversation(conversation_id).await?;
        if self.store.find(&assistant_id).await.is_none() {
            self.store
                .upsert(Message::assistant(
                    assistant_id.clone(),
                    conversation_id.to_string(),
                ))
                .await;
        }

        if let Err(err) = self
            .tracker
            .start_streaming(conversation_id, &assistant_id)
            .await
        {
            log::warn!("Ignoring start after edit-and-resend: {}", err);
        }
        Ok(assistant_id)
    }

    /// Persist edited content/reasoning for a message through the bridge,
    /// then mirror it locally. A timestamp of None keeps the message's
    /// position; local state is untouched on failure.
    pub async fn update_message(
        &self,
        message_id: &str,
        content: &str,
        reasoning: Option<&str>,
        timestamp: Option<i64>,
    ) -> ChatResult<()> {
        if let Err(err) = self
            .bridge
            .update_message(message_id, content, reasoning, timestamp)
            .await
        {
            self.notify_bridge_failure("update_message", err.to_string());
            return Err(err.into());
        }

        if !self
            .store
            .set_content(message_id, content, reasoning, timestamp)
            .await
        {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Streaming Control
    // =========================================================================

    /// Stop an in-flight generation. The tracker goes idle immediately; the
    /// backend cancel is fire-and-forget so UI responsiveness never waits on
    /// cancellation latency.
    pub async fn stop_streaming(&self, conversation_id: &str) {
        self.tracker.stop_streaming(conversation_id).await;

        let bridge = Arc::clone(&self.bridge);
        let conversation_id = conversation_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = bridge.cancel_generation(&conversation_id).await {
                log::warn!(
                    "Generation cancel failed for {}: {}",
                    conversation_id,
                    err
                );
            }
        });
    }

    /// Switch the visible conversation: pause the previous one if it was
    /// streaming, resume the new one if it was paused. Backend generation
    /// continues either way.
    pub async fn set_active_conversation(&self, conversation_id: &str) {
        let previous = {
            let mut active = self.active_conversation.write().await;
            active.replace(conversation_id.to_string())
        };

        if let Some(previous) = previous {
            if previous != conversation_id {
                self.tracker.pause_streaming(&previous).await;
            }
        }
        self.tracker.resume_streaming(conversation_id).await;
    }

    // =========================================================================
    // Permission Resolution
    // =========================================================================

    /// Resolve a pending tool-permission request.
    ///
    /// The first resolution wins; a duplicate (sweep racing a late user
    /// click, or a double click) is a silent no-op. A denial synthesizes one
    /// assistant-role notice per denied tool call.
    pub async fn resolve_permission(
        &self,
        message_id: &str,
        approved: bool,
        allowed_tool_ids: &[String],
    ) -> ChatResult<()> {
        self.resolve_permission_inner(message_id, approved, allowed_tool_ids)
            .await
            .map(|_| ())
    }

    /// Returns true when this call performed the resolution
    async fn resolve_permission_inner(
        &self,
        message_id: &str,
        approved: bool,
        allowed_tool_ids: &[String],
    ) -> ChatResult<bool> {
        let Some(request) = self.gate.claim(message_id).await else {
            log::debug!("Permission request {} already resolved", message_id);
            return Ok(false);
        };

        if let Err(err) = self
            .bridge
            .respond_tool_permission(message_id, approved, allowed_tool_ids)
            .await
        {
            // Keep the request pending; the user can retry or the sweep
            // will take it later
            self.gate.restore(request).await;
            self.notify_bridge_failure("respond_tool_permission", err.to_string());
            return Err(err.into());
        }

        log::info!(
            "Permission resolved: message={} approved={} tools={:?}",
            message_id,
            approved,
            allowed_tool_ids
        );

        if !approved {
            self.record_denial(&request).await;
        }
        Ok(true)
    }

    /// Auto-denial path taken by the timeout sweep. Identical side effects
    /// to an explicit deny, plus a timeout notification when this sweep pass
    /// actually performed the resolution.
    async fn deny_timed_out(&self, message_id: &str) {
        match self.resolve_permission_inner(message_id, false, &[]).await {
            Ok(true) => {
                self.notify(ChatNotification::PermissionTimedOut {
                    message_id: message_id.to_string(),
                });
            }
            Ok(false) => {}
            Err(err) => {
                log::warn!("Timed-out denial for {} failed: {}", message_id, err);
            }
        }
    }

    /// Mark the request's tool_call records denied and insert the visible
    /// denial notices at a normal reply position. Notices are persisted
    /// through the bridge so a later refetch returns them; the local copy
    /// is kept either way and persistence failure only logs.
    async fn record_denial(&self, request: &PermissionRequest) {
        let Some(owner) = self.store.find(&request.message_id).await else {
            log::warn!(
                "Denied request {} has no local assistant message; skipping notice",
                request.message_id
            );
            return;
        };

        for call in &request.tool_calls {
            self.store
                .update_tool_status(&owner.conversation_id, &call.id, ToolCallStatus::Denied)
                .await;

            let notice = Message::assistant_notice(
                owner.conversation_id.clone(),
                denial_notice(&call.name),
            );
            if let Err(err) = self.bridge.create_message(&notice).await {
                log::warn!(
                    "Failed to persist denial notice for {}: {}",
                    request.message_id,
                    err
                );
            }
            self.store.upsert(notice).await;
        }
    }

    // =========================================================================
    // Backend Event Handling
    // =========================================================================

    /// Apply one pushed backend event. Events are delivered in order per
    /// conversation; stale deltas for cancelled generations are dropped here.
    pub async fn handle_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::ContentDelta {
                conversation_id,
                message_id,
                delta,
            } => {
                if !self.tracker.is_active_message(&conversation_id, &message_id).await {
                    log::debug!(
                        "Dropping stale delta: conversation={} message={}",
                        conversation_id,
                        message_id
                    );
                    return;
                }
                if !self.store.append_content(&conversation_id, &message_id, &delta).await {
                    log::warn!(
                        "Delta for unknown message: conversation={} message={}",
                        conversation_id,
                        message_id
                    );
                }
            }
            BackendEvent::ToolCallStatus {
                conversation_id,
                tool_call_id,
                status,
                result,
            } => {
                let updated = self
                    .store
                    .update_tool_status(&conversation_id, &tool_call_id, status)
                    .await;
                let Some(record) = updated else {
                    log::warn!(
                        "Status for unknown tool call: conversation={} call={}",
                        conversation_id,
                        tool_call_id
                    );
                    return;
                };
                if let Some(result) = result {
                    self.store
                        .upsert(Message::tool_result(
                            conversation_id,
                            record.assistant_message_id.clone(),
                            tool_call_id,
                            result,
                        ))
                        .await;
                }
            }
            BackendEvent::PermissionRequested {
                message_id,
                tool_calls,
                timestamp,
            } => {
                // Materialize tool_call records under the requesting turn so
                // the sequencer can anchor them while approval is pending
                if let Some(owner) = self.store.find(&message_id).await {
                    for call in &tool_calls {
                        self.store
                            .upsert(Message::tool_call(
                                owner.conversation_id.clone(),
                                message_id.clone(),
                                call,
                            ))
                            .await;
                    }
                } else {
                    log::warn!(
                        "Permission request for unknown assistant message {}",
                        message_id
                    );
                }

                self.gate
                    .add_request(PermissionRequest {
                        message_id,
                        tool_calls,
                        timestamp,
                    })
                    .await;
            }
        }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Canonical display order for a conversation, recomputed per call
    pub async fn sequenced_messages(&self, conversation_id: &str) -> Vec<Message> {
        let messages = self.store.list_by_conversation(conversation_id).await;
        sequence(&messages)
    }

    /// Refetch a conversation from the backend and replace local records
    pub async fn sync_conversation(&self, conversation_id: &str) -> ChatResult<()> {
        let messages = match self.bridge.fetch_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(err) => {
                self.notify_bridge_failure("fetch_messages", err.to_string());
                return Err(err.into());
            }
        };
        self.store
            .replace_conversation(conversation_id, messages)
            .await;
        Ok(())
    }

    /// Streaming state of one conversation
    pub async fn streaming_state(&self, conversation_id: &str) -> StreamingState {
        self.tracker.state(conversation_id).await
    }

    /// Pending permission requests, keyed by assistant message id
    pub async fn pending_permissions(
        &self,
    ) -> std::collections::HashMap<String, PermissionRequest> {
        self.gate.list_pending().await
    }

    /// Message store accessor (read paths and event adapters)
    pub fn store(&self) -> &MessageStore {
        &self.store
    }
}

// ============================================================================
// Tests
// ============================================================================
