use super::payload::parse_delivery;
use super::state::ApiState;
use crate::error::{Error, WebhookError};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

/// Acknowledgment body for a processed delivery.
pub(super) const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

const SUBSCRIBE_MODE: &str = "subscribe";

#[derive(Debug, Deserialize)]
pub(super) struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Subscription handshake: echo the challenge when mode and token match.
/// A handshake without a challenge is refused like a bad token.
pub(super) async fn verify(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let mode_ok = query.mode.as_deref() == Some(SUBSCRIBE_MODE);
    let token_ok = query.verify_token.as_deref() == Some(state.verify_token.expose());

    if let (true, true, Some(challenge)) = (mode_ok, token_ok, query.challenge) {
        tracing::info!("webhook verified");
        return (StatusCode::OK, challenge).into_response();
    }

    tracing::warn!(mode = ?query.mode, "webhook verification failed");
    (StatusCode::FORBIDDEN, "Verification failed").into_response()
}

/// Message delivery: run a chat turn for every text message, in order.
pub(super) async fn receive(State(state): State<Arc<ApiState>>, body: Bytes) -> Response {
    match process_delivery(&state, &body).await {
        Ok(count) => {
            tracing::debug!(count, "delivery processed");
            (StatusCode::OK, EVENT_RECEIVED).into_response()
        }
        Err(Error::Webhook(WebhookError::InvalidObjectType(object))) => {
            tracing::warn!(?object, "rejected delivery with unexpected object type");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"status": "invalid object type"})),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!(%error, "processing error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": error.to_string()})),
            )
                .into_response()
        }
    }
}

async fn process_delivery(state: &ApiState, body: &[u8]) -> crate::Result<usize> {
    tracing::debug!(payload = %String::from_utf8_lossy(body), "received delivery");

    let messages = parse_delivery(body)?;
    for message in &messages {
        // A model failure aborts the rest of the batch.
        state.agent.handle_message(message).await?;
    }

    Ok(messages.len())
}
