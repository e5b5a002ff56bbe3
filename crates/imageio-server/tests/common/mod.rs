//! Shared harness for imageio server integration tests
//!
//! - [`TestServer`]: the full router on a real listener, with its own storage root
//! - [`TestPostgres`]: a PostgreSQL container with migrations applied (needs Docker)

#![allow(dead_code)]

use anyhow::{Context, Result};
use imageio_server::api;
use imageio_server::config::{CorsConfig, MediaConfig};
use imageio_server::db::{CatalogStore, MemoryCatalogStore};
use imageio_server::features::FeatureState;
use imageio_server::storage::MediaStorage;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tokio::task::JoinHandle;
use tracing::info;

/// Install a test-friendly subscriber once per test binary
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,imageio_server=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

// ============================================================================
// HTTP Server
// ============================================================================

/// The application served on `127.0.0.1` at an ephemeral port
pub struct TestServer {
    pub base_url: String,
    pub state: FeatureState,
    root: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve an in-memory catalog
    pub async fn start() -> Result<Self> {
        Self::start_with_store(Arc::new(MemoryCatalogStore::new())).await
    }

    pub async fn start_with_store(store: Arc<dyn CatalogStore>) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let root = tempfile::tempdir().context("Failed to create storage root")?;
        let media = MediaConfig {
            storage_path: root.path().to_path_buf(),
            public_base_url: format!("{}/storage", base_url),
            fetch_timeout_secs: 5,
            ..MediaConfig::default()
        };
        let state = FeatureState::new(store, MediaStorage::new(root.path()), media)?;

        let cors = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        };
        let app = api::create_router(state.clone(), &cors);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Test server stopped: {}", e);
            }
        });

        info!(%base_url, "Test server started");
        Ok(Self {
            base_url,
            state,
            root,
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn storage_root(&self) -> &std::path::Path {
        self.root.path()
    }

    /// Client that reports redirects instead of following them
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Multipart body carrying a spreadsheet in the `file` field
pub fn spreadsheet_form(file_name: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL container with migrations applied
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container.get_host().await.context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        info!("Migrations completed successfully");

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
