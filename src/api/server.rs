//! HTTP server setup: router and lifecycle.

use super::state::ApiState;
use super::webhook;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use std::net::SocketAddr;
use std::sync::Arc;

const LIVENESS_TEXT: &str = "Masterzi WhatsApp AI Assistant is running!";

/// Build the application router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the given address.
///
/// The server drains in-flight requests once `shutdown_rx` flips to `true`.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<ApiState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}

async fn index() -> &'static str {
    LIVENESS_TEXT
}
