// Message Sequencer
//
// Pure function producing the canonical display order for one conversation.
// Tool_call records are anchored directly after the assistant turn that
// produced them, whatever their own timestamps say; everything else follows
// timestamp order. Recomputed on every render from the store's contents.

use std::collections::{HashMap, HashSet};

use crate::models::{Message, MessageRole};

/// Order a conversation's messages for display.
///
/// 1. Stable sort by timestamp ascending (ties keep input order).
/// 2. Map each assistant id to its tool_call children, in sorted order.
/// 3. Walk once, emitting each message followed immediately by its
///    not-yet-emitted tool_call children.
///
/// The output is a permutation of the input: nothing is dropped or
/// duplicated, and the function is a fixed point on its own output. A
/// tool_call whose owner is absent from the batch (partial load) stays at
/// its own timestamp position. Tool result records keep their sorted slot;
/// folding them into tool_call display state is the rendering layer's job.
pub fn sequence(messages: &[Message]) -> Vec<Message> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| m.timestamp);

    // Assistant id -> tool_call children, preserving sorted relative order
    let mut children: HashMap<&str, Vec<&Message>> = HashMap::new();
    for &message in &sorted {
        if message.role == MessageRole::ToolCall {
            if let Some(owner) = message.assistant_message_id.as_deref() {
                children.entry(owner).or_default().push(message);
            }
        }
    }

    let mut emitted: HashSet<&str> = HashSet::with_capacity(sorted.len());
    let mut ordered = Vec::with_capacity(sorted.len());

    for &message in &sorted {
        if !emitted.insert(message.id.as_str()) {
            continue;
        }
        ordered.push(message.clone());

        if message.role == MessageRole::Assistant {
            if let Some(calls) = children.get(message.id.as_str()) {
                for &call in calls {
                    if emitted.insert(call.id.as_str()) {
                        ordered.push(call.clone());
                    }
                }
            }
        }
    }

    ordered
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolCall;

    fn msg(id: &str, role: MessageRole, ts: i64) -> Message {
        let mut m = Message::user("c1".to_string(), String::new());
        m.id = id.to_string();
        m.role = role;
        m.timestamp = ts;
        m
    }

    fn tool_call_msg(id: &str, owner: &str, ts: i64) -> Message {
        let call = ToolCall::new("tool".to_string(), serde_json::Value::Null);
        let mut m = Message::tool_call("c1".to_string(), owner.to_string(), &call);
        m.id = id.to_string();
        m.timestamp = ts;
        m
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_tool_call_anchored_to_owner_over_timestamp() {
        // Timestamp order is a1, u2, t1 - grouping forces t1 after a1
        let messages = vec![
            msg("a1", MessageRole::Assistant, 10),
            tool_call_msg("t1", "a1", 30),
            msg("u2", MessageRole::User, 20),
        ];

        assert_eq!(ids(&sequence(&messages)), vec!["a1", "t1", "u2"]);
    }

    #[test]
    fn test_children_keep_their_relative_timestamp_order() {
        let messages = vec![
            tool_call_msg("t2", "a1", 50),
            msg("a1", MessageRole::Assistant, 10),
            tool_call_msg("t1", "a1", 40),
        ];

        assert_eq!(ids(&sequence(&messages)), vec!["a1", "t1", "t2"]);
    }

    #[test]
    fn test_output_is_permutation_of_input() {
        let messages = vec![
            msg("u1", MessageRole::User, 5),
            msg("a1", MessageRole::Assistant, 10),
            tool_call_msg("t1", "a1", 30),
            msg("r1", MessageRole::Tool, 35),
            msg("u2", MessageRole::User, 20),
            msg("a2", MessageRole::Assistant, 40),
        ];

        let ordered = sequence(&messages);
        assert_eq!(ordered.len(), messages.len());

        let mut input_ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        let mut output_ids = ids(&ordered);
        input_ids.sort_unstable();
        output_ids.sort_unstable();
        assert_eq!(input_ids, output_ids);
    }

    #[test]
    fn test_idempotent_on_sequenced_input() {
        let messages = vec![
            msg("a1", MessageRole::Assistant, 10),
            tool_call_msg("t1", "a1", 30),
            msg("u2", MessageRole::User, 20),
        ];

        let once = sequence(&messages);
        let twice = sequence(&once);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_orphaned_tool_call_stays_at_its_timestamp() {
        // Owner a9 is not in the batch (partial load) - t1 must not be dropped
        let messages = vec![
            msg("u1", MessageRole::User, 10),
            tool_call_msg("t1", "a9", 20),
            msg("u2", MessageRole::User, 30),
        ];

        assert_eq!(ids(&sequence(&messages)), vec!["u1", "t1", "u2"]);
    }

    #[test]
    fn test_tool_result_keeps_sorted_position() {
        let messages = vec![
            msg("a1", MessageRole::Assistant, 10),
            tool_call_msg("t1", "a1", 40),
            msg("r1", MessageRole::Tool, 20),
        ];

        // The tool result is not a tool_call: it stays at its timestamp slot
        assert_eq!(ids(&sequence(&messages)), vec!["a1", "t1", "r1"]);
    }

    #[test]
    fn test_stable_on_timestamp_ties() {
        let messages = vec![
            msg("u1", MessageRole::User, 10),
            msg("u2", MessageRole::User, 10),
            msg("u3", MessageRole::User, 10),
        ];

        assert_eq!(ids(&sequence(&messages)), vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(sequence(&[]).is_empty());
    }
}
