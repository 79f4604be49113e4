// Backend Bridge contract
//
// The native backend owns persistence, provider transport, and generation
// tasks. The core reaches it through this trait only; the concrete IPC
// mechanism lives in the desktop shell. All calls are asynchronous round
// trips and must never be awaited while holding core state locks.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Message;

/// Backend bridge failure
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// IPC transport failed (backend unreachable, channel closed)
    #[error("Bridge transport error: {0}")]
    Transport(String),

    /// The backend rejected the command
    #[error("Backend rejected command: {0}")]
    Rejected(String),
}

/// Result type for bridge calls
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Commands exposed by the native backend.
#[async_trait]
pub trait BackendBridge: Send + Sync {
    /// Send a user message; returns the id of the assistant message the
    /// backend will stream the reply into.
    async fn send_message(&self, conversation_id: &str, content: &str) -> BridgeResult<String>;

    /// Replace a prior user message and regenerate from that point; returns
    /// the id of the replacement assistant message.
    async fn edit_and_resend_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        new_content: &str,
    ) -> BridgeResult<String>;

    /// Persist new content/reasoning for an existing message. A timestamp
    /// of None keeps the message's stored timestamp.
    async fn update_message(
        &self,
        id: &str,
        content: &str,
        reasoning: Option<&str>,
        timestamp: Option<i64>,
    ) -> BridgeResult<()>;

    /// Persist a locally created message record.
    async fn create_message(&self, message: &Message) -> BridgeResult<()>;

    /// Record a tool-permission decision for the given assistant message.
    async fn respond_tool_permission(
        &self,
        message_id: &str,
        approved: bool,
        allowed_tool_ids: &[String],
    ) -> BridgeResult<()>;

    /// Fetch the authoritative message set for a conversation.
    async fn fetch_messages(&self, conversation_id: &str) -> BridgeResult<Vec<Message>>;

    /// Ask the backend to cancel an in-flight generation. Cooperative: the
    /// caller does not wait for confirmation.
    async fn cancel_generation(&self, conversation_id: &str) -> BridgeResult<()>;
}
