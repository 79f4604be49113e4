// Chat data models
//
// Core entities for the chat orchestration layer: messages, tool calls,
// and pending tool-permission requests.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current wall-clock time as unix milliseconds.
///
/// Message timestamps only need to be monotonic within a conversation;
/// ties are broken by the sequencer's stable sort.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ============================================================================
// Enums
// ============================================================================

/// Message author role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    /// Tool execution result record. Storage/internal only: the UI folds a
    /// tool result into its sibling tool_call record, never renders it alone.
    Tool,
    /// Tool invocation record, anchored under its owning assistant turn.
    ToolCall,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
            MessageRole::ToolCall => write!(f, "tool_call"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "tool" => Ok(MessageRole::Tool),
            "tool_call" => Ok(MessageRole::ToolCall),
            _ => Err(format!("Invalid message role: {}", s)),
        }
    }
}

/// Tool call lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Denied,
}

impl std::fmt::Display for ToolCallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCallStatus::Pending => write!(f, "pending"),
            ToolCallStatus::Running => write!(f, "running"),
            ToolCallStatus::Completed => write!(f, "completed"),
            ToolCallStatus::Failed => write!(f, "failed"),
            ToolCallStatus::Denied => write!(f, "denied"),
        }
    }
}

impl std::str::FromStr for ToolCallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ToolCallStatus::Pending),
            "running" => Ok(ToolCallStatus::Running),
            "completed" => Ok(ToolCallStatus::Completed),
            "failed" => Ok(ToolCallStatus::Failed),
            "denied" => Ok(ToolCallStatus::Denied),
            _ => Err(format!("Invalid tool call status: {}", s)),
        }
    }
}

// ============================================================================
// Core Entities
// ============================================================================

/// Message entity - one record within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Parent conversation ID
    pub conversation_id: String,
    /// Message author role
    pub role: MessageRole,
    /// Message text content
    pub content: String,
    /// Model reasoning trace (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Back-reference to the assistant turn that owns this record
    /// (tool and tool_call records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_message_id: Option<String>,
    /// Tool call this record mirrors (tool and tool_call records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Execution status (tool_call records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_status: Option<ToolCallStatus>,
    /// Creation time, unix milliseconds, monotonic per conversation
    pub timestamp: i64,
}

impl Message {
    /// Create a new user message
    pub fn user(conversation_id: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            role: MessageRole::User,
            content,
            reasoning: None,
            assistant_message_id: None,
            tool_call_id: None,
            tool_status: None,
            timestamp: now_millis(),
        }
    }

    /// Create an assistant message placeholder with a backend-assigned id.
    /// Content starts empty and grows as token deltas arrive.
    pub fn assistant(id: String, conversation_id: String) -> Self {
        Self {
            id,
            conversation_id,
            role: MessageRole::Assistant,
            content: String::new(),
            reasoning: None,
            assistant_message_id: None,
            tool_call_id: None,
            tool_status: None,
            timestamp: now_millis(),
        }
    }

    /// Create a locally synthesized assistant notice (e.g. a tool denial)
    pub fn assistant_notice(conversation_id: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            role: MessageRole::Assistant,
            content,
            reasoning: None,
            assistant_message_id: None,
            tool_call_id: None,
            tool_status: None,
            timestamp: now_millis(),
        }
    }

    /// Create a tool_call record anchored to its owning assistant turn
    pub fn tool_call(
        conversation_id: String,
        assistant_message_id: String,
        call: &ToolCall,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            role: MessageRole::ToolCall,
            content: call.name.clone(),
            reasoning: None,
            assistant_message_id: Some(assistant_message_id),
            tool_call_id: Some(call.id.clone()),
            tool_status: Some(ToolCallStatus::Pending),
            timestamp: now_millis(),
        }
    }

    /// Create a tool result record for a finished tool call
    pub fn tool_result(
        conversation_id: String,
        assistant_message_id: Option<String>,
        tool_call_id: String,
        content: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            role: MessageRole::Tool,
            content,
            reasoning: None,
            assistant_message_id,
            tool_call_id: Some(tool_call_id),
            tool_status: None,
            timestamp: now_millis(),
        }
    }
}

// ============================================================================
// Tool Calling
// ============================================================================

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Unique call identifier
    pub id: String,
    /// Tool/function name
    pub name: String,
    /// Tool parameters
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call with a generated id
    pub fn new(name: String, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("tc_{}", &Uuid::new_v4().simple().to_string()[..12]),
            name,
            arguments,
        }
    }
}

// ============================================================================
// Permission Requests
// ============================================================================

/// A pending tool-execution approval request, keyed by the assistant
/// message that asked for it. Resolved by the user or timed out by the
/// permission gate's sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Id of the assistant message that requested tool execution
    pub message_id: String,
    /// Tools awaiting approval, in request order
    pub tool_calls: Vec<ToolCall>,
    /// Creation time, unix milliseconds
    pub timestamp: i64,
}

impl PermissionRequest {
    /// Create a request timestamped now
    pub fn new(message_id: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            message_id,
            tool_calls,
            timestamp: now_millis(),
        }
    }

    /// Whether the request has been pending longer than `timeout_ms` at `now`
    pub fn is_expired(&self, now: i64, timeout_ms: i64) -> bool {
        now - self.timestamp > timeout_ms
    }
}

// ============================================================================
// Tests
// ============================================================================
