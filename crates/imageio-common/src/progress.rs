//! Progress events streamed during an import
//!
//! The server writes one JSON object per line (`application/x-ndjson`). A stream
//! consists of `{"done","total"}` progress objects and ends with exactly one terminal
//! object: either the summary `{"done","total","redirect","message"}` or, for failures
//! detected before any row is processed, `{"error"}`.

use serde::{Deserialize, Serialize};

use crate::error::{ImageioError, Result};

/// Media type of a progress stream
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One line of a progress stream
///
/// Variant order matters for deserialization: `Finished` carries a superset of the
/// `Progress` fields and must be tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressEvent {
    Finished {
        done: u64,
        total: u64,
        redirect: String,
        message: String,
    },
    Progress {
        done: u64,
        total: u64,
    },
    Error {
        error: String,
    },
}

impl ProgressEvent {
    pub fn progress(done: u64, total: u64) -> Self {
        Self::Progress { done, total }
    }

    pub fn finished(
        done: u64,
        total: u64,
        redirect: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Finished {
            done,
            total,
            redirect: redirect.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether this event closes the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Serialize as a single newline-terminated line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Incremental decoder for a progress stream
///
/// Network chunks rarely align with line boundaries, so bytes are buffered until a
/// newline arrives. Buffering raw bytes also keeps multi-byte UTF-8 sequences that are
/// split across chunks intact.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete event, or `None` until more bytes arrive
    pub fn next_event(&mut self) -> Option<Result<ProgressEvent>> {
        loop {
            let newline = self.buffer.iter().position(|b| *b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = decode_line(&line) {
                return Some(event);
            }
        }
    }

    /// Decode whatever remains once the stream has ended
    ///
    /// A final line without a trailing newline is still a valid event.
    pub fn finish(mut self) -> Option<Result<ProgressEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<ProgressEvent>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(line).map_err(|source| ImageioError::MalformedProgressLine {
            line: line.to_string(),
            source,
        }),
    )
}
