// Chat Core Error Types

use thiserror::Error;

use super::bridge::BridgeError;

/// Chat core error
#[derive(Error, Debug)]
pub enum ChatError {
    /// A generation is already active for this conversation
    #[error("Conversation already streaming: {0}")]
    AlreadyStreaming(String),

    /// Backend bridge call failed
    #[error("Backend bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Referenced message does not exist locally
    #[error("Message not found: {0}")]
    MessageNotFound(String),
}

/// Result type for chat core operations
pub type ChatResult<T> = Result<T, ChatError>;

impl From<ChatError> for String {
    fn from(err: ChatError) -> Self {
        err.to_string()
    }
}
