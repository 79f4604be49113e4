// Message Store
//
// In-memory owner of message records, keyed per conversation. Pure data:
// insert/update/remove only, no ordering guarantee. Display order is always
// recomputed by the sequencer from the store's current contents; the backend
// owns the persistent copy.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{Message, MessageRole, ToolCallStatus};

/// Per-conversation message records
#[derive(Clone)]
pub struct MessageStore {
    conversations: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or update a message, idempotent by id.
    ///
    /// A repeat upsert with a known id replaces content, reasoning, and tool
    /// status in place, keeping the record's position and timestamp. Streamed
    /// token deltas call this repeatedly with growing content.
    pub async fn upsert(&self, message: Message) {
        let mut conversations = self.conversations.write().await;
        let records = conversations
            .entry(message.conversation_id.clone())
            .or_default();

        if let Some(existing) = records.iter_mut().find(|m| m.id == message.id) {
            existing.content = message.content;
            existing.reasoning = message.reasoning;
            existing.tool_status = message.tool_status;
        } else {
            records.push(message);
        }
    }

    /// Append a token delta to a message's content.
    /// Returns false if the message is unknown.
    pub async fn append_content(
        &self,
        conversation_id: &str,
        message_id: &str,
        delta: &str,
    ) -> bool {
        let mut conversations = self.conversations.write().await;
        let Some(records) = conversations.get_mut(conversation_id) else {
            return false;
        };
        match records.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.content.push_str(delta);
                true
            }
            None => false,
        }
    }

    /// Replace a message's content and reasoning in place; an explicit
    /// timestamp moves the message, None keeps its position.
    /// Returns false if the message is unknown.
    pub async fn set_content(
        &self,
        message_id: &str,
        content: &str,
        reasoning: Option<&str>,
        timestamp: Option<i64>,
    ) -> bool {
        let mut conversations = self.conversations.write().await;
        for records in conversations.values_mut() {
            if let Some(message) = records.iter_mut().find(|m| m.id == message_id) {
                message.content = content.to_string();
                message.reasoning = reasoning.map(|r| r.to_string());
                if let Some(timestamp) = timestamp {
                    message.timestamp = timestamp;
                }
                return true;
            }
        }
        false
    }

    /// Update the status of the tool_call record mirroring `tool_call_id`.
    /// Returns the updated record so callers can reach its owning turn.
    pub async fn update_tool_status(
        &self,
        conversation_id: &str,
        tool_call_id: &str,
        status: ToolCallStatus,
    ) -> Option<Message> {
        let mut conversations = self.conversations.write().await;
        let records = conversations.get_mut(conversation_id)?;
        // Result records share the tool_call_id; only the call record
        // carries the status
        let message = records.iter_mut().find(|m| {
            m.role == MessageRole::ToolCall && m.tool_call_id.as_deref() == Some(tool_call_id)
        })?;
        message.tool_status = Some(status);
        Some(message.clone())
    }

    /// Look up a message by id across conversations
    pub async fn find(&self, message_id: &str) -> Option<Message> {
        let conversations = self.conversations.read().await;
        conversations
            .values()
            .flat_map(|records| records.iter())
            .find(|m| m.id == message_id)
            .cloned()
    }

    /// Remove a message by id. Returns true if a record was removed.
    pub async fn remove(&self, message_id: &str) -> bool {
        let mut conversations = self.conversations.write().await;
        for records in conversations.values_mut() {
            if let Some(index) = records.iter().position(|m| m.id == message_id) {
                records.remove(index);
                return true;
            }
        }
        false
    }

    /// All messages of a conversation, in insertion order
    pub async fn list_by_conversation(&self, conversation_id: &str) -> Vec<Message> {
        let conversations = self.conversations.read().await;
        conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop all messages of a conversation
    pub async fn clear_conversation(&self, conversation_id: &str) {
        let mut conversations = self.conversations.write().await;
        conversations.remove(conversation_id);
    }

    /// Replace a conversation's records with a freshly fetched set
    pub async fn replace_conversation(&self, conversation_id: &str, messages: Vec<Message>) {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation_id.to_string(), messages);
    }
}

// ============================================================================
// Tests
// ============================================================================
