//! Chat turns: persona + history + new message in, reply out.

use crate::conversation::ConversationStore;
use crate::error::{LlmError, Result};
use crate::llm::ChatModel;
use crate::messaging::Messaging;
use crate::{ChatMessage, InboundMessage};

use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on one model call inside a turn.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs one chat turn per inbound message and relays the reply.
pub struct ChatAgent {
    system_prompt: String,
    model: Arc<dyn ChatModel>,
    store: Arc<dyn ConversationStore>,
    messaging: Arc<dyn Messaging>,
    turn_timeout: Duration,
}

impl ChatAgent {
    pub fn new(
        system_prompt: impl Into<String>,
        model: Arc<dyn ChatModel>,
        store: Arc<dyn ConversationStore>,
        messaging: Arc<dyn Messaging>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            model,
            store,
            messaging,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    /// Bound the model call of each turn. The sender's history is locked for
    /// the duration of the call, so this is also the longest a sender waits.
    pub fn with_turn_timeout(mut self, turn_timeout: Duration) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Answer `text` from `sender_id` and record the exchange.
    ///
    /// The sender's history is held for the whole turn. A model error or a
    /// timed-out call leaves it untouched.
    pub async fn respond(&self, sender_id: &str, text: &str) -> Result<String> {
        let mut turn = self.store.begin_turn(sender_id).await;

        let prompt = build_prompt(&self.system_prompt, turn.history(), text);
        tracing::debug!(
            sender_id,
            model = self.model.name(),
            prompt_messages = prompt.len(),
            "calling model"
        );

        let reply = tokio::time::timeout(self.turn_timeout, self.model.complete(&prompt))
            .await
            .map_err(|_| {
                tracing::warn!(sender_id, timeout = ?self.turn_timeout, "model call timed out");
                LlmError::Timeout(self.turn_timeout)
            })??;
        turn.record(text, &reply);

        Ok(reply)
    }

    /// Run a turn for `message` and send the reply back to its sender.
    ///
    /// Delivery is best-effort; only the model call can fail this.
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        tracing::info!(
            sender_id = %message.sender_id,
            message_id = message.id.as_deref().unwrap_or("-"),
            "message received"
        );

        let reply = self.respond(&message.sender_id, &message.text).await?;
        self.messaging
            .send_best_effort(&message.sender_id, &reply)
            .await;

        Ok(())
    }
}

fn build_prompt(system_prompt: &str, history: &[ChatMessage], text: &str) -> Vec<ChatMessage> {
    let mut prompt = Vec::with_capacity(history.len() + 2);
    prompt.push(ChatMessage::system(system_prompt));
    prompt.extend_from_slice(history);
    prompt.push(ChatMessage::user(text));
    prompt
}
