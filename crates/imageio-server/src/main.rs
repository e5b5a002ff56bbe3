//! imageio Server - Main entry point
//!
//! Runs against PostgreSQL by default. Pass `--memory` (or set `IMAGEIO_MEMORY_STORE=true`)
//! to keep the catalog in process instead; stored image files persist either way.

use anyhow::Result;
use imageio_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use imageio_server::{
    api,
    config::Config,
    db::{self, CatalogStore, MemoryCatalogStore, PgCatalogStore},
    features::FeatureState,
    storage::MediaStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("imageio-server")
        .filter_directives("imageio_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting imageio server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = open_store(&config).await?;

    let storage = MediaStorage::init(config.media.storage_path.clone()).await?;
    info!(
        public_base_url = %config.media.public_base_url,
        "Images will be served from {}",
        storage.root().display()
    );

    let state = FeatureState::new(store, storage, config.media.clone())?;
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

fn memory_store_requested() -> bool {
    std::env::args().skip(1).any(|arg| arg == "--memory")
        || std::env::var("IMAGEIO_MEMORY_STORE")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
}

/// Connect to PostgreSQL and run migrations, or fall back to the in-memory catalog
async fn open_store(config: &Config) -> Result<Arc<dyn CatalogStore>> {
    if memory_store_requested() {
        tracing::warn!("Using the in-memory catalog; records are lost on shutdown");
        return Ok(Arc::new(MemoryCatalogStore::new()));
    }

    let pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    Ok(Arc::new(PgCatalogStore::new(pool)))
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give in-flight imports and downloads time to finish
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
