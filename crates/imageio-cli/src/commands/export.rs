//! `imageio export` command implementation
//!
//! Streams an archive or link sheet from the server to a local file.

use crate::api::ApiClient;
use crate::error::{CliError, Result};
use crate::progress;
use colored::Colorize;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_DISPOSITION;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// What to export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Archive,
    Links,
}

impl ExportKind {
    fn fallback_name(self, brand_id: i64) -> String {
        match self {
            Self::Archive => format!("brand-{}-images.zip", brand_id),
            Self::Links => format!("brand-{}-links.xlsx", brand_id),
        }
    }
}

/// Download an export of a brand to `output`, or to the server-suggested name
pub async fn run(
    server_url: String,
    kind: ExportKind,
    brand_id: i64,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = ApiClient::new(server_url)?;

    let response = match kind {
        ExportKind::Archive => client.download_archive(brand_id).await?,
        ExportKind::Links => client.download_links(brand_id).await?,
    };

    let path = output.unwrap_or_else(|| {
        response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(kind.fallback_name(brand_id)))
    });

    let spinner = progress::create_spinner(&format!("Downloading {}", path.display()));
    let written = save(response.bytes_stream(), &path).await;
    spinner.finish_and_clear();
    let written = written?;

    println!(
        "{} Saved {} ({})",
        "✓".green(),
        path.display(),
        progress::format_bytes(written)
    );

    Ok(())
}

/// Write a byte stream to `path`, removing the file if the stream fails
async fn save<S, B, E>(stream: S, path: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    CliError: From<E>,
{
    futures::pin_mut!(stream);
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    let result: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            file.write_all(bytes).await?;
            written += bytes.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }

    Ok(written)
}

/// Filename from a `Content-Disposition: attachment; filename="..."` value
///
/// Path separators are rejected so a server cannot direct writes outside the
/// working directory.
pub fn attachment_filename(value: &str) -> Option<String> {
    let name = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');

    let valid = !name.is_empty() && !name.contains(['/', '\\']) && name != "..";
    valid.then(|| name.to_string())
}
