//! Shared state for the HTTP handlers.

use crate::agent::ChatAgent;
use crate::config::Secret;

use std::sync::Arc;

/// State injected into every handler.
pub struct ApiState {
    /// Secret expected in `hub.verify_token`.
    pub verify_token: Secret,
    /// Orchestrator that answers inbound messages.
    pub agent: Arc<ChatAgent>,
}

impl ApiState {
    pub fn new(verify_token: Secret, agent: Arc<ChatAgent>) -> Self {
        Self {
            verify_token,
            agent,
        }
    }
}
