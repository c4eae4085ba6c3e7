pub mod aggregate;
pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod notify;
pub mod seed;
pub mod types;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::Config;
use crate::error::Result;
use crate::notify::Notifier;

/// Initialize structured logging with tracing.
/// Respects RUST_LOG env var; defaults to `info` for this crate and request traces.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statuspage=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Loads configuration, prepares the store and serves the HTTP API until ctrl-c.
pub async fn run() -> Result<()> {
    let config = Config::from_env()?;

    let db_path = config.db_path.clone();
    let pool = tokio::task::spawn_blocking(move || db::open(&db_path)).await??;
    if config.seed {
        let methods = config.methods_component.clone();
        let seed_pool = pool.clone();
        tokio::task::spawn_blocking(move || seed::seed_if_empty(&seed_pool, &methods)).await??;
    }

    let notifier = Notifier::new(config.webhook_timeout)?;
    let bind = config.bind;
    let operator_enabled = config.operator_token.is_some();
    let state = AppState::new(pool, config, notifier);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, operator_enabled, "Status page listening");
    if !operator_enabled {
        tracing::warn!("STATUSPAGE_OPERATOR_TOKEN is not set; management API is disabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}
