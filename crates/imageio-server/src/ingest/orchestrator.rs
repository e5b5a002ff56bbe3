//! Import orchestration
//!
//! Drives one batch: reads rows from a [`RowSource`], creates an item per titled row,
//! fetches each image slot and finalizes its status, and reports progress after every
//! row. Rows and slots are processed strictly in order, one fetch at a time.
//!
//! Only source-level problems abort a batch. Everything else becomes a diagnostic line
//! and the batch moves on.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::fetcher::MediaFetcher;
use super::progress::ProgressSink;
use super::source::{RowSource, SourceError, SourceRow};
use crate::config::{MediaConfig, MAX_IMAGE_SLOTS};
use crate::db::CatalogStore;
use crate::models::{Brand, Item};
use crate::storage::MediaStorage;

/// Diagnostics listed in a summary message before the rest are only counted
const SUMMARY_DIAGNOSTICS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// Data rows read per batch; 0 disables the limit
    pub max_rows: u64,
    pub max_images: usize,
}

impl ImportSettings {
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            max_rows: config.max_import_rows,
            max_images: config.max_images_per_item,
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_rows: crate::config::DEFAULT_MAX_IMPORT_ROWS,
            max_images: MAX_IMAGE_SLOTS,
        }
    }
}

/// Row counts decided before a batch starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Data rows in the source
    pub available: u64,
    /// Data rows that will be read
    pub total: u64,
}

/// Outcome of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub items_processed: u64,
    pub items_failed: u64,
    pub diagnostics: Vec<String>,
    pub total_rows_available: u64,
    pub rows_read: u64,
}

impl ImportReport {
    /// Report of a batch stopped before any row, carrying the source error
    pub fn aborted(error: &SourceError) -> Self {
        Self {
            diagnostics: vec![error.to_string()],
            ..Self::default()
        }
    }

    /// Human-readable outcome, listing the first few diagnostics
    pub fn summary(&self) -> String {
        let mut message = format!("{} items processed.", self.items_processed);
        if self.items_failed > 0 {
            message.push_str(&format!(" {} items skipped due to errors.", self.items_failed));
        }

        if !self.diagnostics.is_empty() {
            let shown: Vec<&str> = self
                .diagnostics
                .iter()
                .take(SUMMARY_DIAGNOSTICS)
                .map(String::as_str)
                .collect();
            message.push_str("\nDetails: ");
            message.push_str(&shown.join("; "));

            let hidden = self.diagnostics.len().saturating_sub(SUMMARY_DIAGNOSTICS);
            if hidden > 0 {
                message.push_str(&format!(" (+{} more)", hidden));
            }
        }

        message
    }
}

/// Page a finished import sends the user to
pub fn redirect_for(brand_id: i64) -> String {
    format!("/brands/{}", brand_id)
}

/// Absolute http(s) URL with a host, or `None`
pub fn parse_image_url(value: &str) -> Option<Url> {
    let url = Url::parse(value).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some_and(|host| !host.is_empty())).then_some(url)
}

#[derive(Clone)]
pub struct ImportOrchestrator {
    store: Arc<dyn CatalogStore>,
    storage: MediaStorage,
    fetcher: MediaFetcher,
    settings: ImportSettings,
}

impl ImportOrchestrator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        storage: MediaStorage,
        fetcher: MediaFetcher,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            storage,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> ImportSettings {
        self.settings
    }

    /// Count the source's data rows and apply the row limit
    pub async fn plan(&self, source: &RowSource) -> Result<BatchPlan, SourceError> {
        let available = source.count_data_rows().await?;
        if available == 0 {
            return Err(SourceError::Empty);
        }

        let total = match self.settings.max_rows {
            0 => available,
            limit => available.min(limit),
        };
        Ok(BatchPlan { available, total })
    }

    /// Plan and run a batch; source failures yield a report with a single diagnostic
    pub async fn import(
        &self,
        source: &RowSource,
        brand: &Brand,
        progress: &dyn ProgressSink,
    ) -> ImportReport {
        match self.plan(source).await {
            Ok(plan) => self.run(source, brand, plan, progress).await,
            Err(e) => {
                warn!(brand_id = brand.id, error = %e, "Import aborted");
                ImportReport::aborted(&e)
            },
        }
    }

    /// Process up to `plan.total` rows into `brand`
    #[tracing::instrument(skip(self, source, brand, progress), fields(brand_id = brand.id))]
    pub async fn run(
        &self,
        source: &RowSource,
        brand: &Brand,
        plan: BatchPlan,
        progress: &dyn ProgressSink,
    ) -> ImportReport {
        info!(
            available = plan.available,
            total = plan.total,
            "Starting import"
        );

        let mut report = ImportReport {
            total_rows_available: plan.available,
            ..ImportReport::default()
        };
        progress.report(0, plan.total).await;

        let mut rows = source.rows();
        while report.rows_read < plan.total {
            match rows.next().await {
                Some(Ok(row)) => {
                    report.rows_read += 1;
                    self.process_row(brand, &row, &mut report).await;
                    progress.report(report.rows_read, plan.total).await;
                },
                Some(Err(e)) => {
                    warn!(error = %e, rows_read = report.rows_read, "Source failed mid-batch");
                    report.diagnostics.push(e.to_string());
                    break;
                },
                None => break,
            }
        }
        drop(rows);

        if plan.available > plan.total {
            report.diagnostics.push(format!(
                "Row limit reached: {} rows skipped (limit {})",
                plan.available - plan.total,
                plan.total
            ));
        }

        info!(
            items_processed = report.items_processed,
            items_failed = report.items_failed,
            diagnostics = report.diagnostics.len(),
            "Import finished"
        );

        progress
            .finish(
                report.rows_read,
                plan.total,
                &redirect_for(brand.id),
                &report.summary(),
            )
            .await;

        report
    }

    async fn process_row(&self, brand: &Brand, row: &SourceRow, report: &mut ImportReport) {
        let title = row.title();
        if title.is_empty() {
            return;
        }

        let item = match self.store.create_item(brand.id, title).await {
            Ok(item) => item,
            Err(e) => {
                warn!(row = row.number, error = %e, "Item not created");
                report.items_failed += 1;
                report.diagnostics.push(format!("Row {}: {}", row.number, e));
                return;
            },
        };
        report.items_processed += 1;

        for (slot, value) in row.image_cells().take(self.settings.max_images) {
            if let Err(diagnostic) = self.process_slot(brand, &item, slot, value).await {
                report
                    .diagnostics
                    .push(format!("Row {}, image-{}: {}", row.number, slot, diagnostic));
            }
        }
    }

    /// Fetch one image slot; `Err` carries the diagnostic text
    async fn process_slot(
        &self,
        brand: &Brand,
        item: &Item,
        slot: i32,
        value: &str,
    ) -> Result<(), String> {
        let Some(url) = parse_image_url(value) else {
            return Err(format!("invalid URL - {}", value));
        };

        let image = self
            .store
            .create_image(item.id, slot, Some(value))
            .await
            .map_err(|e| e.to_string())?;

        let dir = self.storage.item_dir(brand.id, item.id);
        match self.fetcher.fetch(&url, &dir).await {
            Ok(artifact) => {
                let path = MediaStorage::relative_path(brand.id, item.id, &artifact.filename);
                if let Err(e) = self
                    .store
                    .mark_image_downloaded(image.id, &path, &artifact.filename)
                    .await
                {
                    self.storage.reclaim(&[path]).await;
                    return Err(e.to_string());
                }
                Ok(())
            },
            Err(e) => {
                warn!(url = %value, reason = %e, "Image download failed");
                self.store
                    .mark_image_failed(image.id)
                    .await
                    .map_err(|e| e.to_string())?;
                Err(format!("download failed - {} ({})", value, e))
            },
        }
    }
}
