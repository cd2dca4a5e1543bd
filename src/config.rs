//! Configuration loading and validation.

use crate::error::{ConfigError, Result};

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default persona sent as the system message on every turn.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Your Name is Masterzi, and you're a helpful English teacher.";

/// Masterzi configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the webhook server binds to.
    pub bind: SocketAddr,

    /// Secret compared against `hub.verify_token` during the handshake.
    pub verify_token: Secret,

    /// Language-model provider configuration.
    pub llm: LlmConfig,

    /// WhatsApp Cloud API configuration.
    pub whatsapp: WhatsAppConfig,

    /// Conversation behavior settings.
    pub conversation: ConversationConfig,
}

/// Language-model provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the chat completions endpoint.
    pub api_key: Secret,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Model name, e.g. `gpt-4o-mini`.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on one model call. A sender's turn holds their history
    /// for this long at most.
    pub timeout: Duration,
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Access token passed as the `access_token` query parameter.
    pub access_token: Secret,

    /// Business phone number ID that sends replies.
    pub phone_number_id: String,

    /// Graph API base URL.
    pub graph_base_url: String,

    /// Graph API version segment, e.g. `v17.0`.
    pub api_version: String,

    /// Timeout for a single send call.
    pub send_timeout: Duration,
}

/// Conversation behavior configuration.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Persona prepended to every prompt.
    pub system_prompt: String,

    /// Upper bound on stored messages per sender. None keeps everything.
    pub max_history_messages: Option<usize>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_history_messages: None,
        }
    }
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a dotenv file into the process environment, then read the config.
    ///
    /// Values from the file override variables already set, so a checked-in
    /// `.env` behaves the same on every host.
    pub fn load_with_env_file(path: Option<&Path>) -> Result<Self> {
        let loaded = match path {
            Some(path) => dotenvy::from_path_override(path).map_err(|error| {
                ConfigError::EnvFile {
                    path: path.display().to_string(),
                    reason: error.to_string(),
                }
            }),
            // A missing default `.env` is fine.
            None => match dotenvy::dotenv_override() {
                Ok(_) => Ok(()),
                Err(error) if error.not_found() => Ok(()),
                Err(error) => Err(ConfigError::EnvFile {
                    path: ".env".into(),
                    reason: error.to_string(),
                }),
            },
        };
        loaded?;

        Self::load()
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::MissingKey("OPENAI_API_KEY".into()))?;
        let access_token = get("PAGE_ACCESS_TOKEN")
            .ok_or_else(|| ConfigError::MissingKey("PAGE_ACCESS_TOKEN".into()))?;

        let bind = parse_or("BIND_ADDR", get("BIND_ADDR"), || {
            SocketAddr::from(([0, 0, 0, 0], 5000))
        })?;

        let llm = LlmConfig {
            api_key: Secret::new(api_key),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into()),
            model: get("MODEL_NAME").unwrap_or_else(|| "gpt-4o-mini".into()),
            temperature: parse_or("MODEL_TEMPERATURE", get("MODEL_TEMPERATURE"), || 0.7)?,
            timeout: Duration::from_secs(parse_or(
                "MODEL_TIMEOUT_SECS",
                get("MODEL_TIMEOUT_SECS"),
                || 60,
            )?),
        };

        if llm.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "MODEL_TIMEOUT_SECS".into(),
                reason: "must be greater than zero".into(),
            }
            .into());
        }

        let whatsapp = WhatsAppConfig {
            access_token: Secret::new(access_token),
            phone_number_id: get("PHONE_NUMBER_ID").unwrap_or_else(|| "707308075793480".into()),
            graph_base_url: get("GRAPH_API_BASE_URL")
                .unwrap_or_else(|| "https://graph.facebook.com".into()),
            api_version: get("GRAPH_API_VERSION").unwrap_or_else(|| "v17.0".into()),
            send_timeout: Duration::from_secs(parse_or(
                "SEND_TIMEOUT_SECS",
                get("SEND_TIMEOUT_SECS"),
                || 10,
            )?),
        };

        let max_history_messages =
            parse_optional::<usize>("HISTORY_MAX_MESSAGES", get("HISTORY_MAX_MESSAGES"))?;
        // Exchanges are stored in pairs; a smaller window would keep nothing.
        if max_history_messages.is_some_and(|max| max < 2) {
            return Err(ConfigError::Invalid {
                key: "HISTORY_MAX_MESSAGES".into(),
                reason: "must be at least 2".into(),
            }
            .into());
        }

        let conversation = ConversationConfig {
            system_prompt: get("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
            max_history_messages,
        };

        Ok(Self {
            bind,
            verify_token: Secret::new(get("VERIFY_TOKEN").unwrap_or_else(|| "masterzi".into())),
            llm,
            whatsapp,
            conversation,
        })
    }
}

fn parse_optional<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.trim().parse::<T>().map_err(|error| {
            ConfigError::Invalid {
                key: key.into(),
                reason: error.to_string(),
            }
            .into()
        })
    })
    .transpose()
}

fn parse_or<T>(key: &str, raw: Option<String>, default: impl FnOnce() -> T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key, raw)?.unwrap_or_else(default))
}
