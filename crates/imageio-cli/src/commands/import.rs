//! `imageio import` command implementation
//!
//! Uploads a spreadsheet and follows the server's NDJSON progress stream.

use crate::api::ApiClient;
use crate::error::{CliError, Result};
use crate::progress;
use colored::Colorize;
use futures::{pin_mut, Stream, StreamExt};
use imageio_common::progress::{NdjsonDecoder, ProgressEvent};
use indicatif::ProgressBar;
use std::path::PathBuf;

/// Terminal state of a finished import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub done: u64,
    pub total: u64,
    pub redirect: String,
    pub message: String,
}

/// Import a spreadsheet into a brand
pub async fn run(server_url: String, brand_id: i64, file: PathBuf) -> Result<()> {
    let client = ApiClient::new(server_url)?;

    println!("{} Uploading {}...", "↑".cyan(), file.display());
    let response = client.start_import(brand_id, &file).await?;

    let pb = progress::create_import_progress(&format!("Importing into brand {}", brand_id));
    let outcome = follow_progress(response.bytes_stream(), &pb).await;
    match &outcome {
        Ok(_) => pb.finish(),
        Err(_) => pb.abandon(),
    }
    let outcome = outcome?;

    let mut lines = outcome.message.lines();
    if let Some(summary) = lines.next() {
        println!("{} {}", "✓".green(), summary);
    }
    for line in lines {
        println!("  {}", line.yellow());
    }
    println!("View the results at {}{}", client.base_url(), outcome.redirect);

    Ok(())
}

/// Drive `pb` from a raw progress stream until its terminal event
pub async fn follow_progress<S, B, E>(stream: S, pb: &ProgressBar) -> Result<ImportOutcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    CliError: From<E>,
{
    pin_mut!(stream);
    let mut decoder = NdjsonDecoder::new();

    while let Some(chunk) = stream.next().await {
        decoder.push(chunk?.as_ref());
        while let Some(event) = decoder.next_event() {
            if let Some(outcome) = apply(event?, pb)? {
                return Ok(outcome);
            }
        }
    }

    if let Some(event) = decoder.finish() {
        if let Some(outcome) = apply(event?, pb)? {
            return Ok(outcome);
        }
    }

    Err(CliError::import(
        "The server closed the progress stream before the import finished",
    ))
}

fn apply(event: ProgressEvent, pb: &ProgressBar) -> Result<Option<ImportOutcome>> {
    match event {
        ProgressEvent::Progress { done, total } => {
            pb.set_length(total);
            pb.set_position(done);
            Ok(None)
        },
        ProgressEvent::Finished {
            done,
            total,
            redirect,
            message,
        } => {
            pb.set_length(total);
            pb.set_position(done);
            Ok(Some(ImportOutcome {
                done,
                total,
                redirect,
                message,
            }))
        },
        ProgressEvent::Error { error } => Err(CliError::import(error)),
    }
}
