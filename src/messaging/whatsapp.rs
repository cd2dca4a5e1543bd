//! WhatsApp Cloud API adapter (outbound text messages).

use crate::config::WhatsAppConfig;
use crate::error::{MessagingError, Result};
use crate::messaging::traits::Messaging;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;

/// Maximum text body length accepted by the Cloud API, in characters.
pub const MAX_TEXT_BODY_CHARS: usize = 4096;

const PLATFORM: &str = "whatsapp";

/// Sends replies through `POST /{version}/{phone_number_id}/messages`.
pub struct WhatsAppAdapter {
    http_client: reqwest::Client,
    access_token: String,
    messages_url: String,
}

#[derive(Debug, Serialize)]
struct TextMessagePayload<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

impl WhatsAppAdapter {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()
            .with_context(|| "failed to build WhatsApp HTTP client")?;

        let messages_url = format!(
            "{}/{}/{}/messages",
            config.graph_base_url.trim_end_matches('/'),
            config.api_version,
            config.phone_number_id
        );

        Ok(Self {
            http_client,
            access_token: config.access_token.expose().to_string(),
            messages_url,
        })
    }
}

impl std::fmt::Debug for WhatsAppAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppAdapter")
            .field("messages_url", &self.messages_url)
            .finish()
    }
}

#[async_trait]
impl Messaging for WhatsAppAdapter {
    fn name(&self) -> &str {
        PLATFORM
    }

    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<()> {
        let payload = TextMessagePayload {
            messaging_product: PLATFORM,
            recipient_type: "individual",
            to: recipient_id,
            message_type: "text",
            text: TextBody {
                preview_url: false,
                body: truncate_chars(text, MAX_TEXT_BODY_CHARS),
            },
        };

        let response = self
            .http_client
            .post(&self.messages_url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|error| MessagingError::Transport {
                platform: PLATFORM.into(),
                // Strip the URL so the access token never lands in logs.
                reason: error.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Rejected {
                platform: PLATFORM.into(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(())
    }
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::error::Error;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_adapter(base_url: &str) -> WhatsAppAdapter {
        WhatsAppAdapter::new(&WhatsAppConfig {
            access_token: Secret::new("EAAG-token"),
            phone_number_id: "1234567890".into(),
            graph_base_url: base_url.to_string(),
            api_version: "v17.0".into(),
            send_timeout: Duration::from_secs(2),
        })
        .expect("adapter should build")
    }

    #[test]
    fn truncate_chars_keeps_short_text() {
        assert_eq!(truncate_chars("hello", 4096), "hello");
    }

    #[test]
    fn truncate_chars_cuts_exactly_at_limit() {
        let text = "a".repeat(5000);
        assert_eq!(truncate_chars(&text, MAX_TEXT_BODY_CHARS).chars().count(), 4096);
    }

    #[test]
    fn truncate_chars_counts_characters_not_bytes() {
        let text = "ñ".repeat(4100);
        let truncated = truncate_chars(&text, MAX_TEXT_BODY_CHARS);

        assert_eq!(truncated.chars().count(), 4096);
        assert_eq!(truncated.len(), 4096 * 'ñ'.len_utf8());
    }

    #[tokio::test]
    async fn posts_text_payload_with_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v17.0/1234567890/messages"))
            .and(query_param("access_token", "EAAG-token"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15550001111",
                "type": "text",
                "text": {"preview_url": false, "body": "Hello there"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.1"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        test_adapter(&server.uri())
            .send_text("15550001111", "Hello there")
            .await
            .expect("send should succeed");
    }

    #[tokio::test]
    async fn long_bodies_are_truncated_before_sending() {
        let server = MockServer::start().await;
        let expected_body = "x".repeat(MAX_TEXT_BODY_CHARS);
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15550001111",
                "type": "text",
                "text": {"preview_url": false, "body": expected_body},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        test_adapter(&server.uri())
            .send_text("15550001111", &"x".repeat(6000))
            .await
            .expect("send should succeed");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid recipient"))
            .mount(&server)
            .await;

        let error = test_adapter(&server.uri())
            .send_text("bogus", "hi")
            .await
            .expect_err("400 must fail");

        assert!(matches!(
            error,
            Error::Messaging(MessagingError::Rejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn best_effort_send_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        // Returns unit; the failure only shows up in logs.
        test_adapter(&server.uri())
            .send_best_effort("15550001111", "hi")
            .await;
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_access_token() {
        // Nothing listens on this port.
        let adapter = test_adapter("http://127.0.0.1:9");
        let error = adapter
            .send_text("15550001111", "hi")
            .await
            .expect_err("connection must fail");

        assert!(matches!(error, Error::Messaging(MessagingError::Transport { .. })));
        assert!(!error.to_string().contains("EAAG-token"));
    }
}
