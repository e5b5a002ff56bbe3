//! Error types shared across imageio crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, ImageioError>;

/// Main error type for shared imageio code
#[derive(Error, Debug)]
pub enum ImageioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed progress line '{line}': {source}")]
    MalformedProgressLine {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
