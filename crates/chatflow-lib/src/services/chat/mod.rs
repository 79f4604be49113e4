// Chat Core Module
//
// The chat streaming & tool-call permission orchestration layer:
// - Message store and canonical display ordering
// - Per-conversation streaming state (idle/streaming/paused)
// - Tool-permission gating with timeout auto-denial
// - Backend bridge contract and event handling

pub mod bridge;
pub mod controller;
pub mod error;
pub mod message_store;
pub mod permission_gate;
pub mod sequencer;
pub mod stream_tracker;

// Re-export main types
pub use bridge::{BackendBridge, BridgeError, BridgeResult};
pub use controller::ChatController;
pub use error::{ChatError, ChatResult};
pub use message_store::MessageStore;
pub use permission_gate::{PermissionGate, PermissionGateConfig};
pub use sequencer::sequence;
pub use stream_tracker::{StreamTracker, StreamingSession, StreamingState};
