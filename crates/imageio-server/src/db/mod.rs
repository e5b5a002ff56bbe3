//! Catalog persistence
//!
//! [`CatalogStore`] is the seam between the HTTP/ingestion layers and the datastore.
//! [`postgres::PgCatalogStore`] backs production; [`memory::MemoryCatalogStore`] keeps the
//! same semantics in-process for tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::models::{Brand, BrandKind, BrandSummary, DownloadedImage, Image, Item, ItemOrder, ItemWithImages};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Requested or referenced record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("{0}")]
    Duplicate(String),

    #[error("Image position {0} is outside the allowed slots 1..=5")]
    InvalidPosition(i32),

    /// The image is missing or already `downloaded`/`failed`
    #[error("Image {0} is not pending")]
    InvalidTransition(i64),
}

impl StoreError {
    pub fn not_found(resource_type: &str, id: i64) -> Self {
        Self::NotFound(format!("{} {} not found", resource_type, id))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Records removed by an item delete, for reclaiming its files after commit
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedItem {
    pub brand_id: i64,
    pub storage_paths: Vec<String>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn create_brand(&self, name: &str, kind: BrandKind) -> StoreResult<Brand>;

    async fn get_brand(&self, id: i64) -> StoreResult<Option<Brand>>;

    /// Brands ordered by kind then name, with item and downloaded-image counts
    async fn list_brands(&self) -> StoreResult<Vec<BrandSummary>>;

    /// Delete a brand with its items and images in one transaction
    ///
    /// Returns the storage paths of the removed images, or `None` if the brand did not
    /// exist. Files are left for the caller to reclaim.
    async fn delete_brand(&self, id: i64) -> StoreResult<Option<Vec<String>>>;

    /// Fails with [`StoreError::NotFound`] if the brand does not exist
    async fn create_item(&self, brand_id: i64, title: &str) -> StoreResult<Item>;

    async fn get_item(&self, id: i64) -> StoreResult<Option<Item>>;

    async fn delete_item(&self, id: i64) -> StoreResult<Option<DeletedItem>>;

    async fn list_items(&self, brand_id: i64, order: ItemOrder) -> StoreResult<Vec<ItemWithImages>>;

    /// Create an image slot in `pending` status
    async fn create_image(
        &self,
        item_id: i64,
        position: i32,
        original_url: Option<&str>,
    ) -> StoreResult<Image>;

    /// `pending` -> `downloaded`; any other current state is [`StoreError::InvalidTransition`]
    async fn mark_image_downloaded(
        &self,
        image_id: i64,
        storage_path: &str,
        public_filename: &str,
    ) -> StoreResult<()>;

    /// `pending` -> `failed`; any other current state is [`StoreError::InvalidTransition`]
    async fn mark_image_failed(&self, image_id: i64) -> StoreResult<()>;

    /// Downloaded images of a brand ordered by item title, then position
    async fn downloaded_images(&self, brand_id: i64) -> StoreResult<Vec<DownloadedImage>>;
}

pub async fn create_pool(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}
