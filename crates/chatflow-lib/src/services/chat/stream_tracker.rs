// Streaming Session Tracker
//
// Per-conversation state machine for assistant response streaming. Each
// conversation is independent; several may stream concurrently, each backed
// by its own backend-side generation task. A generation counter per
// conversation lets late token deltas from a cancelled or superseded
// generation be recognized as stale and dropped.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{ChatError, ChatResult};

/// Streaming state of one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingState {
    /// No active generation
    Idle,
    /// A response is being appended token by token
    Streaming,
    /// Generation continues backend-side but the conversation is not visible
    Paused,
}

/// Tracked streaming session for one conversation
#[derive(Debug, Clone)]
pub struct StreamingSession {
    pub state: StreamingState,
    /// Id of the assistant message being appended to (Streaming/Paused)
    pub message_id: Option<String>,
    /// Bumped on every start and stop; stale-event guard
    pub generation: u64,
    /// Generation the tracked message started at. A delta is current only
    /// while this still equals `generation`, i.e. no stop intervened.
    pub message_generation: u64,
}

impl Default for StreamingSession {
    fn default() -> Self {
        Self {
            state: StreamingState::Idle,
            message_id: None,
            generation: 0,
            message_generation: 0,
        }
    }
}

/// Tracks streaming sessions across conversations
#[derive(Clone)]
pub struct StreamTracker {
    sessions: Arc<RwLock<HashMap<String, StreamingSession>>>,
}

impl Default for StreamTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Begin streaming into `message_id`. Valid only from Idle: a concurrent
    /// start for the same conversation is rejected and leaves the first
    /// generation untouched.
    pub async fn start_streaming(&self, conversation_id: &str, message_id: &str) -> ChatResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(conversation_id.to_string()).or_default();

        if session.state != StreamingState::Idle {
            return Err(ChatError::AlreadyStreaming(conversation_id.to_string()));
        }

        session.state = StreamingState::Streaming;
        session.message_id = Some(message_id.to_string());
        session.generation += 1;
        session.message_generation = session.generation;
        log::info!(
            "Streaming started: conversation={} message={} generation={}",
            conversation_id,
            message_id,
            session.generation
        );
        Ok(())
    }

    /// Pause a streaming conversation, retaining its message id so it can
    /// resume without losing position. No-op from Paused or Idle.
    pub async fn pause_streaming(&self, conversation_id: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(conversation_id) else {
            return;
        };
        if session.state == StreamingState::Streaming {
            session.state = StreamingState::Paused;
        } else {
            log::warn!(
                "Ignoring pause for conversation {} in state {:?}",
                conversation_id,
                session.state
            );
        }
    }

    /// Resume a paused conversation. No-op from Streaming or Idle.
    pub async fn resume_streaming(&self, conversation_id: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(conversation_id) else {
            return;
        };
        if session.state == StreamingState::Paused {
            session.state = StreamingState::Streaming;
        } else if session.state == StreamingState::Idle {
            log::warn!("Ignoring resume for idle conversation {}", conversation_id);
        }
    }

    /// Stop streaming from any state: transitions to Idle, clears the message
    /// id, and bumps the generation counter so late deltas can never match.
    /// Cancelling the backend-side generation is the caller's job.
    pub async fn stop_streaming(&self, conversation_id: &str) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(conversation_id.to_string()).or_default();
        session.state = StreamingState::Idle;
        session.message_id = None;
        session.generation += 1;
        log::info!(
            "Streaming stopped: conversation={} generation={}",
            conversation_id,
            session.generation
        );
    }

    /// Whether a token delta for `message_id` should still be applied:
    /// the message must be the tracked one and its generation current.
    /// False once the conversation stopped or moved on to another message,
    /// even if a later generation reuses the same message id.
    pub async fn is_active_message(&self, conversation_id: &str, message_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(conversation_id)
            .map(|session| {
                session.message_id.as_deref() == Some(message_id)
                    && session.generation == session.message_generation
            })
            .unwrap_or(false)
    }

    /// Current state of a conversation (Idle when never seen)
    pub async fn state(&self, conversation_id: &str) -> StreamingState {
        let sessions = self.sessions.read().await;
        sessions
            .get(conversation_id)
            .map(|session| session.state)
            .unwrap_or(StreamingState::Idle)
    }

    /// Message id currently being streamed into, if any
    pub async fn streaming_message_id(&self, conversation_id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(conversation_id)
            .and_then(|session| session.message_id.clone())
    }

    /// Snapshot of all tracked sessions, for diagnostics
    pub async fn snapshot(&self) -> HashMap<String, StreamingSession> {
        let sessions = self.sessions.read().await;
        sessions.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_pause_resume_keeps_message_id() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        assert_eq!(tracker.state("c1").await, StreamingState::Streaming);

        tracker.pause_streaming("c1").await;
        assert_eq!(tracker.state("c1").await, StreamingState::Paused);

        tracker.resume_streaming("c1").await;
        assert_eq!(tracker.state("c1").await, StreamingState::Streaming);
        assert_eq!(
            tracker.streaming_message_id("c1").await.as_deref(),
            Some("m1")
        );
    }

    #[tokio::test]
    async fn test_concurrent_start_rejected() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        let second = tracker.start_streaming("c1", "m2").await;

        assert!(matches!(second, Err(ChatError::AlreadyStreaming(_))));
        // First generation untouched
        assert_eq!(tracker.state("c1").await, StreamingState::Streaming);
        assert_eq!(
            tracker.streaming_message_id("c1").await.as_deref(),
            Some("m1")
        );
    }

    #[tokio::test]
    async fn test_pause_resume_are_lenient_no_ops() {
        let tracker = StreamTracker::new();

        // Never-seen conversation: nothing to do, nothing to fail
        tracker.pause_streaming("c1").await;
        tracker.resume_streaming("c1").await;
        assert_eq!(tracker.state("c1").await, StreamingState::Idle);

        tracker.start_streaming("c1", "m1").await.unwrap();
        tracker.resume_streaming("c1").await; // already streaming
        assert_eq!(tracker.state("c1").await, StreamingState::Streaming);

        tracker.pause_streaming("c1").await;
        tracker.pause_streaming("c1").await; // already paused
        assert_eq!(tracker.state("c1").await, StreamingState::Paused);
    }

    #[tokio::test]
    async fn test_stop_clears_and_allows_restart() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        tracker.stop_streaming("c1").await;

        assert_eq!(tracker.state("c1").await, StreamingState::Idle);
        assert!(tracker.streaming_message_id("c1").await.is_none());

        // One-way transition: resuming after stop stays idle
        tracker.resume_streaming("c1").await;
        assert_eq!(tracker.state("c1").await, StreamingState::Idle);

        tracker.start_streaming("c1", "m2").await.unwrap();
        assert_eq!(
            tracker.streaming_message_id("c1").await.as_deref(),
            Some("m2")
        );
    }

    #[tokio::test]
    async fn test_stale_delta_guard() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        assert!(tracker.is_active_message("c1", "m1").await);
        assert!(!tracker.is_active_message("c1", "m0").await);

        // Paused conversations still accept deltas; generation runs on
        tracker.pause_streaming("c1").await;
        assert!(tracker.is_active_message("c1", "m1").await);

        tracker.stop_streaming("c1").await;
        assert!(!tracker.is_active_message("c1", "m1").await);
    }

    #[tokio::test]
    async fn test_delta_guard_is_generation_keyed() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot["c1"].generation, snapshot["c1"].message_generation);

        tracker.stop_streaming("c1").await;
        let snapshot = tracker.snapshot().await;
        assert_ne!(snapshot["c1"].generation, snapshot["c1"].message_generation);
        assert!(!tracker.is_active_message("c1", "m1").await);

        // A new generation reusing the same message id is current again
        tracker.start_streaming("c1", "m1").await.unwrap();
        assert!(tracker.is_active_message("c1", "m1").await);
    }

    #[tokio::test]
    async fn test_generation_counter_bumps_on_start_and_stop() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        tracker.stop_streaming("c1").await;
        tracker.start_streaming("c1", "m2").await.unwrap();

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot["c1"].generation, 3);
    }

    #[tokio::test]
    async fn test_conversations_stream_independently() {
        let tracker = StreamTracker::new();

        tracker.start_streaming("c1", "m1").await.unwrap();
        tracker.start_streaming("c2", "m2").await.unwrap();
        tracker.pause_streaming("c1").await;

        assert_eq!(tracker.state("c1").await, StreamingState::Paused);
        assert_eq!(tracker.state("c2").await, StreamingState::Streaming);

        tracker.stop_streaming("c2").await;
        assert_eq!(tracker.state("c1").await, StreamingState::Paused);
        assert_eq!(tracker.state("c2").await, StreamingState::Idle);
    }
}
