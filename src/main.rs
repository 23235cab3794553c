use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::settings::AppConfig;
use crate::infrastructure::downloader::ytdlp::YtDlp;
use crate::infrastructure::redis::client::RedisService;
use crate::infrastructure::storage::s3::StorageService;
use crate::state::AppState;
use crate::workers::ledger::{DeletionLedger, MemoryLedger, RedisLedger};

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("invalid configuration")?;

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("cannot create {}", config.download_dir.display()))?;

    let storage = StorageService::new(&config);
    if let Err(e) = storage.health_check().await {
        warn!("Bucket '{}' is not reachable yet: {}", config.storage_bucket, e);
    }

    let tool = YtDlp::new(
        &config.ytdlp_path,
        Duration::from_secs(config.probe_timeout_secs),
        Duration::from_secs(config.download_timeout_secs),
    );
    tool.probe().await;

    let ledger: Arc<dyn DeletionLedger> = match &config.redis_url {
        Some(url) => Arc::new(RedisLedger::new(
            RedisService::new(url).await.context("cannot connect to Redis")?,
        )),
        None => {
            warn!("REDIS_URL not set: pending deletions will not survive a restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let storage = Arc::new(storage);
    let (scheduler, reaper) = workers::reaper::channel(storage.clone(), ledger, config.retention());
    tokio::spawn(reaper.run());

    let port = config.server_port;
    let state = AppState::new(config, Arc::new(tool), storage, scheduler);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("cannot bind port {}", port))?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
