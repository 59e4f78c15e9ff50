//! Outreach Server - Headless Daemon
//!
//! - Runs the dispatcher: leases an account and a proxy per work item, calls
//!   the scraper, records the outcome
//! - Runs background maintenance and health triage
//! - Serves the operator REST API on /api/* and Prometheus metrics on /metrics
//!
//! Access via: http://localhost:8050

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use tokio::sync::watch;
use tracing::info;

mod api;
mod cli;
mod commands;
mod logging;
mod prometheus;
mod router;
mod scheduler;
mod server_utils;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = outreach_core::utils::paths::get_data_dir()
        .map_err(|e| anyhow::anyhow!("Failed to get data directory: {}", e))?;
    let _log_guard = logging::init_logging(&cli.log_level, &data_dir)?;

    match cli.command {
        None => serve(cli.port, &data_dir).await,
        Some(Commands::Serve { port }) => serve(port, &data_dir).await,
        Some(Commands::Status { json }) => commands::handle_status(cli.port, json).await,
        Some(Commands::RetryFailed) => commands::handle_retry_failed(cli.port).await,
        Some(Commands::InitConfig { force }) => commands::handle_init_config(&data_dir, force),
    }
}

async fn serve(port: u16, data_dir: &Path) -> Result<()> {
    info!("🚀 Outreach Server starting on port {}...", port);

    prometheus::init_metrics()?;

    let state = AppState::open(data_dir)?;
    let recovered = state.queue().recover_interrupted();
    info!(
        "✅ Application state initialized: {} accounts, {} proxies, {} work items ({} recovered)",
        state.accounts().stats().total,
        state.proxies().stats().total,
        state.queue().stats().total,
        recovered
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = scheduler::start(&state, &shutdown_rx);

    let app = router::build_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("🔌 API available at http://localhost:{}/api/", port);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    info!("⏳ Waiting for in-flight dispatches to finish...");
    let _ = shutdown_tx.send(true);
    for task in background {
        if let Err(e) = task.await {
            tracing::warn!("Background task ended abnormally: {}", e);
        }
    }
    info!("👋 Shutdown complete");

    Ok(())
}
