//! Top-level error types for Masterzi.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key: {0}")]
    MissingKey(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Language-model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    ProviderRequest(String),

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outbound messaging errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to reach {platform}: {reason}")]
    Transport { platform: String, reason: String },

    #[error("{platform} rejected message ({status}): {body}")]
    Rejected {
        platform: String,
        status: u16,
        body: String,
    },
}

/// Inbound webhook payload errors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid object type: {0:?}")]
    InvalidObjectType(Option<String>),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
}
