//! Bounded media fetcher
//!
//! Streams a remote image to disk under a collision-free name, enforcing a timeout and a
//! byte ceiling. A fetch either produces a complete file or leaves nothing behind.

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::config::MediaConfig;
use crate::storage::namespace;

const USER_AGENT: &str = "imageio/1.0";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Network(String),

    #[error("timed out")]
    Timeout,

    #[error("exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A fetched file saved to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Name the file was created under, unique within its directory
    pub filename: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
    max_bytes: u64,
}

impl MediaFetcher {
    pub fn new(timeout: Duration, max_bytes: u64, verify_tls: bool) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self { client, max_bytes })
    }

    pub fn from_config(config: &MediaConfig) -> Result<Self, FetchError> {
        Self::new(config.fetch_timeout(), config.fetch_max_bytes, config.fetch_verify_tls)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Download `url` into `dir`, creating the directory if needed
    #[tracing::instrument(skip(self, dir), fields(url = %url))]
    pub async fn fetch(&self, url: &Url, dir: &Path) -> Result<Artifact, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {}", status)));
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let desired = derive_filename(url, content_type.as_deref());

        tokio::fs::create_dir_all(dir).await?;
        let (mut file, filename) = namespace::create_unique(dir, &desired).await?;
        let path = dir.join(&filename);

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        let result: Result<(), FetchError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                written += chunk.len() as u64;
                if written > self.max_bytes {
                    return Err(FetchError::TooLarge {
                        limit: self.max_bytes,
                    });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %remove_err, "Partial file not removed");
            }
            return Err(e);
        }

        debug!(filename = %filename, bytes = written, "Image saved");
        Ok(Artifact {
            filename,
            path,
            bytes: written,
        })
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    let Some(subtype) = essence
        .as_deref()
        .and_then(|value| value.strip_prefix("image/"))
    else {
        return "jpg";
    };

    match subtype.split('+').next().unwrap_or(subtype) {
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        "svg" => "svg",
        "bmp" => "bmp",
        "tiff" => "tiff",
        _ => "jpg",
    }
}

/// Desired filename for a download, before sanitizing and collision handling
///
/// Uses the last path segment with trailing dots removed; a segment without an extension
/// gets one from the content type. Without any segment a generated
/// `image-{timestamp}-{random}` name is used.
pub fn derive_filename(url: &Url, content_type: Option<&str>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| segment.trim_end_matches('.'))
        .filter(|segment| !segment.is_empty())
        .map(str::to_string);

    let ext = extension_for(content_type);
    match segment {
        Some(name) if namespace::split_extension(&name).1.is_some() => name,
        Some(name) => format!("{}.{}", name, ext),
        None => {
            let random = 1000 + uuid::Uuid::new_v4().as_u128() % 9000;
            format!("image-{}-{}.{}", chrono::Utc::now().timestamp(), random, ext)
        },
    }
}
