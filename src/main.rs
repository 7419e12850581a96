mod config;
mod contracts;
mod db;
mod error;
mod extract;
mod handlers;
mod models;
mod routes;
mod state;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env_file(dotenvy::dotenv())?;

    let config = Config::from_env()?;
    let exporters = telemetry::init_telemetry(&config)?;

    let pool = db::create_pool(&config).await?;
    db::prepare_schema(&pool).await?;

    tracing::info!("Connected to database and migrations applied");

    let state = AppState::new(Arc::new(PgStore::new(pool)));
    let app = routes::create_router(state);
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(exporters) = exporters {
        tracing::info!("Flushing telemetry");
        exporters.shutdown();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
