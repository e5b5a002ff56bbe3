//! Read-only exports of a brand's downloaded images
//!
//! - **archive**: zip of the image files, one folder per item
//! - **links**: XLSX sheet of public image URLs, in the same layout imports read

pub mod archive;
pub mod links;

use thiserror::Error;

use crate::db::StoreError;

pub use archive::{build_archive, ImageArchive};
pub use links::{build_links_workbook, sheet_name};

#[derive(Debug, Error)]
pub enum ExportError {
    /// No downloaded image of the brand has a file on disk
    #[error("No downloaded images to export")]
    ArchiveEmpty,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
