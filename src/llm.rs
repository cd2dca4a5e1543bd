//! Language-model provider access.

pub mod model;

pub use model::{ChatModel, OpenAiChatModel};
