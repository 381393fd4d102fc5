use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use erp_api::config::{config, StoreBackend};
use erp_api::database::{DataStore, MemoryStore, PgStore};
use erp_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erp_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config().clone();
    config.validate()?;
    tracing::info!("Starting ERP API in {:?} mode", config.environment);

    let store: Arc<dyn DataStore> = match config.database.backend {
        StoreBackend::Postgres => Arc::new(
            PgStore::connect(&config.database)
                .await
                .context("failed to connect to the database")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = config.bind_address();
    let state = AppState::new(store, config).context("invalid session configuration")?;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("ERP API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("ERP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
