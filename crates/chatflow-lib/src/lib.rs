// ChatFlow core library
//
// Chat streaming and tool-call permission orchestration for the desktop
// client. The UI layer renders what the controller exposes; the native
// backend is reached only through the BackendBridge contract.

pub mod models;
pub mod services;

pub use models::{
    BackendEvent, ChatNotification, Message, MessageRole, PermissionRequest, ToolCall,
    ToolCallStatus,
};
pub use services::chat::{
    sequence, BackendBridge, BridgeError, ChatController, ChatError, ChatResult, MessageStore,
    PermissionGate, PermissionGateConfig, StreamTracker, StreamingState,
};
