//! Error types for the imageio CLI
//!
//! Messages are user-facing and say what to check next.

use imageio_common::ImageioError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The server answered with an error envelope
    #[error("Server rejected the request ({code}): {message}")]
    Server { code: String, message: String },

    /// The server answered with something other than the expected response
    #[error("Server error: {0}. Ensure the imageio server is running and accessible.")]
    Api(String),

    /// The import stream reported a failure or ended early
    #[error("Import failed: {0}")]
    Import(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your connection and the server URL.")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse server response: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A progress line could not be decoded
    #[error("Malformed progress stream: {0}")]
    Progress(#[from] ImageioError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create an import error
    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_message() {
        let err = CliError::Server {
            code: "NOT_FOUND".to_string(),
            message: "Brand 4 not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Server rejected the request (NOT_FOUND): Brand 4 not found"
        );
    }

    #[test]
    fn test_file_not_found_mentions_path() {
        let err = CliError::FileNotFound("rows.xlsx".to_string());
        assert!(err.to_string().contains("'rows.xlsx'"));
    }
}
