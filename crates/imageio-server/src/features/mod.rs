//! Feature modules implementing the imageio API
//!
//! Each feature is a vertical slice with its own commands, queries, and routes.
//!
//! # Features
//!
//! - **brands**: create, list, inspect and delete brands and categories
//! - **items**: delete items together with their stored images
//! - **imports**: spreadsheet uploads with optional NDJSON progress streaming
//! - **exports**: zip archive and link spreadsheet downloads

pub mod brands;
pub mod exports;
pub mod imports;
pub mod items;
pub mod shared;

use axum::Router;
use std::sync::Arc;

use crate::config::MediaConfig;
use crate::db::CatalogStore;
use crate::ingest::{BatchLocks, FetchError, ImportOrchestrator, ImportSettings, MediaFetcher};
use crate::storage::MediaStorage;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: Arc<dyn CatalogStore>,
    pub storage: MediaStorage,
    pub orchestrator: ImportOrchestrator,
    pub media: Arc<MediaConfig>,
    /// Brands with an import in progress
    pub locks: BatchLocks,
}

impl FeatureState {
    /// Wire the import pipeline over `store` and `storage` using the media limits
    pub fn new(
        store: Arc<dyn CatalogStore>,
        storage: MediaStorage,
        media: MediaConfig,
    ) -> Result<Self, FetchError> {
        let fetcher = MediaFetcher::from_config(&media)?;
        let orchestrator = ImportOrchestrator::new(
            store.clone(),
            storage.clone(),
            fetcher,
            ImportSettings::from_config(&media),
        );

        Ok(Self {
            store,
            storage,
            orchestrator,
            media: Arc::new(media),
            locks: BatchLocks::new(),
        })
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/brands` - Brand management, imports and exports
/// - `/items` - Item management
pub fn router(state: FeatureState) -> Router<()> {
    let brands = brands::brands_routes()
        .merge(imports::imports_routes(state.media.max_upload_bytes))
        .merge(exports::exports_routes());

    Router::new()
        .nest("/brands", brands.with_state(state.clone()))
        .nest("/items", items::items_routes().with_state(state))
}
