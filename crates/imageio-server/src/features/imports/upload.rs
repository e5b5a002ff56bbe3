//! Spooling multipart uploads to disk

use axum::extract::multipart::{Multipart, MultipartError};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Multipart field carrying the spreadsheet
pub const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No spreadsheet uploaded; send it in the '{FILE_FIELD}' field")]
    MissingFile,
    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded spreadsheet in a temporary file, deleted on drop
#[derive(Debug)]
pub struct SpooledUpload {
    pub file: NamedTempFile,
    /// File name the client sent, if any
    pub declared_name: Option<String>,
    pub bytes: u64,
}

impl SpooledUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Write the `file` field to a temporary file chunk by chunk
///
/// The temporary file keeps the declared extension so the format can be recognized
/// from the path as well.
pub async fn spool_upload(mut multipart: Multipart) -> Result<SpooledUpload, UploadError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty());
        let suffix = declared_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix("imageio-upload-")
            .suffix(&suffix)
            .tempfile()?;
        let mut writer = tokio::fs::File::from_std(temp.reopen()?);

        let mut bytes = 0u64;
        while let Some(chunk) = field.chunk().await? {
            writer.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        writer.flush().await?;

        if bytes == 0 {
            return Err(UploadError::MissingFile);
        }

        return Ok(SpooledUpload {
            file: temp,
            declared_name,
            bytes,
        });
    }

    Err(UploadError::MissingFile)
}
