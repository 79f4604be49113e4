// Backend push events and user-facing notifications
//
// The native backend reports generation progress through a stream of typed
// events. The core applies them one at a time; ordering is guaranteed by
// the bridge per conversation, never globally.

use serde::{Deserialize, Serialize};

use super::chat::{ToolCall, ToolCallStatus};

/// Push event from the backend bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackendEvent {
    /// Token delta appended to a streaming assistant message
    #[serde(rename = "contentDelta")]
    ContentDelta {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        delta: String,
    },
    /// Tool call lifecycle change (started/finished/failed)
    #[serde(rename = "toolCallStatus")]
    ToolCallStatus {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        status: ToolCallStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    /// One or more tool calls require user approval
    #[serde(rename = "permissionRequest")]
    PermissionRequested {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<ToolCall>,
        timestamp: i64,
    },
}

/// User-visible notification raised by the chat core.
///
/// Delivered over an mpsc channel owned by the UI layer; a dropped
/// receiver is tolerated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatNotification {
    /// A backend bridge call failed; local state was left unchanged
    #[serde(rename = "bridgeFailure")]
    BridgeFailure { action: String, detail: String },
    /// A permission request expired and was auto-denied
    #[serde(rename = "permissionTimeout")]
    PermissionTimedOut {
        #[serde(rename = "messageId")]
        message_id: String,
    },
}
