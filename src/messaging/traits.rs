//! Messaging trait for platforms that deliver replies.

use crate::error::Result;

use async_trait::async_trait;

/// Outbound side of a messaging platform.
#[async_trait]
pub trait Messaging: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &str;

    /// Send a plain text message, reporting transport and API failures.
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<()>;

    /// Best-effort send: failures are logged and swallowed.
    ///
    /// The caller gets no signal about delivery and nothing is retried.
    async fn send_best_effort(&self, recipient_id: &str, text: &str) {
        match self.send_text(recipient_id, text).await {
            Ok(()) => {
                tracing::info!(adapter = self.name(), recipient_id, "message sent");
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    adapter = self.name(),
                    recipient_id,
                    "failed to send message"
                );
            }
        }
    }
}
