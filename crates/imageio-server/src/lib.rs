//! imageio Server Library
//!
//! HTTP server for bulk image ingestion into brand and category catalogs.
//!
//! # Overview
//!
//! - **Catalog**: brands and categories own items; each item has up to five image slots
//! - **Imports**: spreadsheet rows name an item and list image URLs; images are fetched
//!   with a timeout and a size ceiling and stored under `{brand}/{item}/{filename}`
//! - **Progress**: imports can stream NDJSON progress lines while they run
//! - **Exports**: a zip archive of a brand's images and an XLSX sheet of their public links
//!
//! # Architecture
//!
//! Features are vertical slices (`features/*`) with commands for writes, queries for reads,
//! and routes. Persistence sits behind the [`db::CatalogStore`] trait, with a PostgreSQL
//! implementation and an in-memory one with identical semantics.
//!
//! # Example
//!
//! ```no_run
//! use imageio_server::{api, config::Config, db::MemoryCatalogStore, features::FeatureState};
//! use imageio_server::storage::MediaStorage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let storage = MediaStorage::init(config.media.storage_path.clone()).await?;
//!     let state =
//!         FeatureState::new(Arc::new(MemoryCatalogStore::new()), storage, config.media.clone())?;
//!     let app = api::create_router(state, &config.cors);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, ServerResult};
