use anyhow::Context;
use banking_ledger::config::AppConfig;
use banking_ledger::infrastructure::{logging, Ledger};
use banking_ledger::web::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init_logging(&config.logging())
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    info!("Starting banking ledger service");

    let ledger = Arc::new(Ledger::new());
    let app = create_router(AppState::new(ledger));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
