//! Spreadsheet imports into a brand

pub mod routes;
pub mod upload;

pub use routes::imports_routes;
pub use upload::{spool_upload, SpooledUpload, UploadError};
