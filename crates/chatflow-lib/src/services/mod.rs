// Services module
// Business logic for the chat orchestration core

pub mod chat;
