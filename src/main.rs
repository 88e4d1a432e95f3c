//! Bookshelf server entry point

use std::time::Duration;

use anyhow::Context;
use bookshelf::config::Config;
use bookshelf::db::Database;
use bookshelf::services::AuthService;
use bookshelf::{AppState, build_app};

/// How often logged-out tokens past their expiry are purged
const REVOCATION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    bookshelf::logging::init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_url,
        page_size = config.page_size,
        "Starting Bookshelf"
    );

    let db = Database::connect_with_retry(
        &config.database_url,
        config.database_max_connections,
        config.database_connect_timeout,
    )
    .await?;
    db.sync_schema().await?;

    let addr = config.bind_address();
    let state = AppState::new(config, db);
    spawn_revocation_cleanup(state.auth.clone());

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_revocation_cleanup(auth: AuthService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REVOCATION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match auth.cleanup_expired_revocations().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired token revocations"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge token revocations"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
