use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docstore_api::config::{self, CollectionAccess};
use docstore_api::database::{manager, CollectionRegistry, StoreHandle};
use docstore_api::{app, AppState};

/// HTTP CRUD service over a document store
#[derive(Debug, Parser)]
#[command(name = "docstore-api", version)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Store connection string, or memory:// (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    tracing::info!("Starting docstore-api in {:?} mode", config.environment);

    if config.security.collection_access == CollectionAccess::Token
        && config.security.collection_token.is_none()
    {
        tracing::warn!("Collection routes require a token but SECURITY_COLLECTION_TOKEN is unset; they will answer 401");
    }

    let registry = CollectionRegistry::new(&config.api.collections)
        .context("invalid API_COLLECTIONS entry")?;

    let store = StoreHandle::pending();
    manager::connect_in_background(config.database.clone(), store.clone());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let app = app(AppState::new(config, store, registry));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);
    tracing::info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
