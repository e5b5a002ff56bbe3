//! Spreadsheet-driven image ingestion
//!
//! # Architecture
//!
//! - **source**: streaming row reader over CSV and workbook uploads
//! - **fetcher**: bounded, streaming image downloads into storage
//! - **orchestrator**: per-batch state machine producing an [`ImportReport`]
//! - **progress**: progress sinks, including the NDJSON channel used by the HTTP layer
//! - **lock**: at most one running batch per brand

pub mod fetcher;
pub mod lock;
pub mod orchestrator;
pub mod progress;
pub mod source;

pub use fetcher::{Artifact, FetchError, MediaFetcher};
pub use lock::{BatchGuard, BatchLocks};
pub use orchestrator::{BatchPlan, ImportOrchestrator, ImportReport, ImportSettings};
pub use progress::{ChannelProgress, NoopProgress, ProgressSink};
pub use source::{RowSource, SourceError, SourceFormat, SourceRow};
