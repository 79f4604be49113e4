// Data models module
// Rust structs that map to the frontend chat interfaces

pub mod chat;
pub mod events;

// Re-export all models for convenience
pub use chat::*;
pub use events::*;
