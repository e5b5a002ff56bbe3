//! Progress sinks for import batches

use async_trait::async_trait;
use imageio_common::progress::ProgressEvent;
use tokio::sync::mpsc;

/// Receives `(done, total)` after every row and the summary once the batch ends
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, done: u64, total: u64);

    async fn finish(&self, done: u64, total: u64, redirect: &str, message: &str);
}

/// Discards all notifications
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn report(&self, _done: u64, _total: u64) {}

    async fn finish(&self, _done: u64, _total: u64, _redirect: &str, _message: &str) {}
}

/// Forwards notifications as [`ProgressEvent`]s over a channel
///
/// The final row's plain progress event is replaced by the terminal summary event.
/// Sends to a closed channel are ignored so a departed client never stops a batch.
pub struct ChannelProgress {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelProgress {
    async fn report(&self, done: u64, total: u64) {
        if total > 0 && done == total {
            return;
        }
        let _ = self.tx.send(ProgressEvent::progress(done, total)).await;
    }

    async fn finish(&self, done: u64, total: u64, redirect: &str, message: &str) {
        let _ = self
            .tx
            .send(ProgressEvent::finished(done, total, redirect, message))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_row_is_folded_into_summary() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelProgress::new(tx);

        sink.report(0, 2).await;
        sink.report(1, 2).await;
        sink.report(2, 2).await;
        sink.finish(2, 2, "/brands/1", "2 items processed.").await;
        drop(sink);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                ProgressEvent::progress(0, 2),
                ProgressEvent::progress(1, 2),
                ProgressEvent::finished(2, 2, "/brands/1", "2 items processed."),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ChannelProgress::new(tx);

        sink.report(0, 1).await;
        sink.finish(1, 1, "/brands/1", "done").await;
    }
}
