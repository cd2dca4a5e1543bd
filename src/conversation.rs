//! Per-sender conversation history.

pub mod history;

pub use history::{ConversationStore, History, InMemoryConversationStore, TurnGuard};
