//! imageio Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the imageio workspace.
//!
//! - **Error Handling**: [`ImageioError`] and the [`Result`] alias
//! - **Logging**: subscriber setup shared by the server and the CLI
//! - **Progress**: the NDJSON progress wire format used by streamed imports
//!
//! # Example
//!
//! ```
//! use imageio_common::progress::{NdjsonDecoder, ProgressEvent};
//!
//! let mut decoder = NdjsonDecoder::new();
//! decoder.push(b"{\"done\":0,\"total\":3}\n{\"done\":1,");
//! assert_eq!(decoder.next_event().transpose().ok().flatten(), Some(ProgressEvent::progress(0, 3)));
//! assert!(decoder.next_event().is_none());
//! ```

pub mod error;
pub mod logging;
pub mod progress;

pub use error::{ImageioError, Result};
