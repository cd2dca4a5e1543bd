//! Chat completion model seam and the OpenAI-compatible implementation.

use crate::ChatMessage;
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

use anyhow::Context as _;
use async_trait::async_trait;

/// A model that turns an ordered prompt into a single reply.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Model name used in logs.
    fn name(&self) -> &str;

    /// Complete the prompt. No retries; errors go straight to the caller.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for any `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_name: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .with_context(|| "failed to build HTTP client")
            .map_err(LlmError::from)?;

        Ok(Self {
            http_client,
            api_key: config.api_key.expose().to_string(),
            base_url: config.base_url.clone(),
            model_name: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model_name,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .http_client
            .post(self.chat_completions_url())
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ProviderRequest(e.to_string()))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            LlmError::ProviderRequest(format!("failed to read response body: {e}"))
        })?;

        let response_body: serde_json::Value =
            serde_json::from_str(&response_text).map_err(|e| {
                LlmError::ProviderRequest(format!(
                    "OpenAI response ({status}) is not valid JSON: {e}\nBody: {}",
                    truncate_body(&response_text)
                ))
            })?;

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(LlmError::ProviderRequest(format!(
                "OpenAI API error ({status}): {message}"
            ))
            .into());
        }

        let reply = parse_openai_response(&response_body, &self.model_name)?;
        tracing::debug!(
            model = %self.model_name,
            prompt_tokens = response_body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            completion_tokens = response_body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
            "model call completed"
        );

        Ok(reply)
    }
}

/// Truncate a response body for error messages to avoid dumping megabytes of HTML.
fn truncate_body(body: &str) -> &str {
    let limit = 500;
    if body.len() <= limit {
        return body;
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn parse_openai_response(body: &serde_json::Value, model_name: &str) -> Result<String> {
    let choice = &body["choices"][0]["message"];

    match choice["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => {
            tracing::warn!(model = %model_name, choice = ?choice, "empty response from provider");
            Err(LlmError::EmptyResponse(model_name.to_string()).into())
        }
    }
}
