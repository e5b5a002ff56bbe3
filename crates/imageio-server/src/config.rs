//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/imageio";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Media Configuration Constants
// ============================================================================

/// Default application URL; public image links live under `{APP_URL}/storage`.
pub const DEFAULT_APP_URL: &str = "http://localhost:8000";

/// Default storage root for downloaded images.
pub const DEFAULT_STORAGE_PATH: &str = "./storage";

/// Image slots per item. Slot positions are `1..=MAX_IMAGE_SLOTS`.
pub const MAX_IMAGE_SLOTS: usize = 5;

/// Default maximum data rows per import (0 = unlimited).
pub const DEFAULT_MAX_IMPORT_ROWS: u64 = 500;

/// Default per-fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default per-fetch size ceiling (20 MiB).
pub const DEFAULT_FETCH_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Default maximum spreadsheet upload size (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub media: MediaConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Storage, import and fetch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub storage_path: PathBuf,
    /// Prefix of public image links, without a trailing slash
    pub public_base_url: String,
    pub max_images_per_item: usize,
    /// Data rows accepted per import; 0 disables the limit
    pub max_import_rows: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_max_bytes: u64,
    /// Verify TLS certificates of image hosts. Off by default so that sources with
    /// self-signed or misconfigured certificates can still be imported.
    pub fetch_verify_tls: bool,
    pub max_upload_bytes: usize,
}

impl MediaConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let app_url = env_or("APP_URL", DEFAULT_APP_URL);

        let config = Config {
            server: ServerConfig {
                host: env_or("IMAGEIO_HOST", DEFAULT_SERVER_HOST),
                port: env_parse("IMAGEIO_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "IMAGEIO_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_parse(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_parse(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", true),
            },
            media: MediaConfig {
                storage_path: PathBuf::from(env_or("STORAGE_PATH", DEFAULT_STORAGE_PATH)),
                public_base_url: std::env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("{}/storage", app_url.trim_end_matches('/')))
                    .trim_end_matches('/')
                    .to_string(),
                max_images_per_item: env_parse("MAX_IMAGES_PER_ITEM", MAX_IMAGE_SLOTS),
                max_import_rows: env_parse("MAX_EXCEL_ROWS", DEFAULT_MAX_IMPORT_ROWS),
                fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
                fetch_max_bytes: env_parse("FETCH_MAX_BYTES", DEFAULT_FETCH_MAX_BYTES),
                fetch_verify_tls: env_parse("FETCH_VERIFY_TLS", false),
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.media.max_images_per_item == 0 || self.media.max_images_per_item > MAX_IMAGE_SLOTS
        {
            anyhow::bail!(
                "MAX_IMAGES_PER_ITEM must be between 1 and {} (got {})",
                MAX_IMAGE_SLOTS,
                self.media.max_images_per_item
            );
        }

        if self.media.fetch_timeout_secs == 0 {
            anyhow::bail!("FETCH_TIMEOUT_SECS must be greater than 0");
        }

        if self.media.fetch_max_bytes == 0 {
            anyhow::bail!("FETCH_MAX_BYTES must be greater than 0");
        }

        if url::Url::parse(&self.media.public_base_url).is_err() {
            anyhow::bail!("PUBLIC_BASE_URL '{}' is not an absolute URL", self.media.public_base_url);
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        if !self.media.fetch_verify_tls {
            tracing::info!("TLS certificate verification is disabled for image fetches");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            media: MediaConfig::default(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            public_base_url: format!("{}/storage", DEFAULT_APP_URL),
            max_images_per_item: MAX_IMAGE_SLOTS,
            max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            fetch_verify_tls: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_media_defaults() {
        let media = MediaConfig::default();
        assert_eq!(media.max_images_per_item, 5);
        assert_eq!(media.max_import_rows, 500);
        assert_eq!(media.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(media.fetch_max_bytes, 20 * 1024 * 1024);
        assert!(!media.fetch_verify_tls);
        assert_eq!(media.public_base_url, "http://localhost:8000/storage");
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_slot_count_out_of_range() {
        let mut config = Config::default();
        config.media.max_images_per_item = 6;
        assert!(config.validate().is_err());
        config.media.max_images_per_item = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_public_base_url() {
        let mut config = Config::default();
        config.media.public_base_url = "/storage".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_reads_media_env() {
        std::env::set_var("APP_URL", "https://cdn.example.com/");
        std::env::set_var("MAX_EXCEL_ROWS", "0");
        std::env::set_var("FETCH_VERIFY_TLS", "true");

        let config = Config::load().unwrap();

        std::env::remove_var("APP_URL");
        std::env::remove_var("MAX_EXCEL_ROWS");
        std::env::remove_var("FETCH_VERIFY_TLS");

        assert_eq!(config.media.public_base_url, "https://cdn.example.com/storage");
        assert_eq!(config.media.max_import_rows, 0);
        assert!(config.media.fetch_verify_tls);
    }
}
