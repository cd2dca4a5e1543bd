//! Masterzi CLI entry point.

use masterzi::agent::ChatAgent;
use masterzi::api::{ApiState, start_http_server};
use masterzi::config::Config;
use masterzi::conversation::InMemoryConversationStore;
use masterzi::llm::OpenAiChatModel;
use masterzi::messaging::WhatsAppAdapter;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::sync::Arc;

#[derive(Parser)]
#[command(name = "masterzi")]
#[command(about = "WhatsApp assistant that answers every sender with a language model")]
struct Cli {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<std::net::SocketAddr>,

    /// Path to a dotenv file (defaults to ./.env when present)
    #[arg(short, long)]
    env_file: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(cli.debug))
        .init();

    let mut config = Config::load_with_env_file(cli.env_file.as_deref())
        .context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    tracing::info!(
        model = %config.llm.model,
        phone_number_id = %config.whatsapp.phone_number_id,
        history_window = ?config.conversation.max_history_messages,
        "configuration loaded"
    );

    let model = OpenAiChatModel::new(&config.llm).context("failed to initialize model client")?;
    let whatsapp =
        WhatsAppAdapter::new(&config.whatsapp).context("failed to initialize WhatsApp adapter")?;
    let store = InMemoryConversationStore::new()
        .with_max_messages(config.conversation.max_history_messages);

    let agent = Arc::new(
        ChatAgent::new(
            config.conversation.system_prompt.clone(),
            Arc::new(model),
            Arc::new(store),
            Arc::new(whatsapp),
        )
        .with_turn_timeout(config.llm.timeout),
    );
    let state = Arc::new(ApiState::new(config.verify_token.clone(), agent.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = start_http_server(config.bind, state, shutdown_rx)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("Masterzi started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    let _ = shutdown_tx.send(true);
    server.await.context("HTTP server task panicked")?;

    tracing::info!(
        senders = agent.store().sender_count().await,
        "Masterzi stopped"
    );
    Ok(())
}

fn build_env_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
