//! Typed decoding of WhatsApp webhook deliveries.

use crate::InboundMessage;
use crate::error::{Result, WebhookError};

use serde::Deserialize;

/// `object` value carried by every WhatsApp Business delivery.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    #[serde(default)]
    value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookValue {
    // Decoded one by one so a bad message can't take its siblings down.
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    from: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<WebhookText>,
}

#[derive(Debug, Deserialize)]
struct WebhookText {
    body: String,
}

/// Decode a raw delivery body into the text messages it carries, in order.
///
/// Non-text messages (media, reactions) and status callbacks yield nothing.
/// A single message with an unexpected shape is logged and skipped.
pub fn parse_delivery(body: &[u8]) -> Result<Vec<InboundMessage>> {
    let raw: serde_json::Value =
        serde_json::from_slice(body).map_err(|error| WebhookError::InvalidJson(error.to_string()))?;

    let object = raw.get("object").and_then(serde_json::Value::as_str);
    if object != Some(WHATSAPP_OBJECT) {
        return Err(WebhookError::InvalidObjectType(object.map(String::from)).into());
    }

    let payload: WebhookPayload = serde_json::from_value(raw)
        .map_err(|error| WebhookError::MalformedPayload(error.to_string()))?;

    let mut messages = Vec::new();
    for raw_message in payload
        .entry
        .into_iter()
        .flat_map(|entry| entry.changes)
        .flat_map(|change| change.value.messages)
    {
        let message = match serde_json::from_value::<WebhookMessage>(raw_message) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "skipping malformed webhook message");
                continue;
            }
        };

        let Some(text) = message.text else {
            tracing::debug!(sender_id = %message.from, "ignoring non-text message");
            continue;
        };

        messages.push(InboundMessage {
            id: message.id,
            sender_id: message.from.into(),
            text: text.body,
        });
    }

    Ok(messages)
}
