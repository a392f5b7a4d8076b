//! Download queue between the feed scans and the download workers.
//!
//! An unbounded multi-producer channel: every scan holds a [`QueueSender`] clone and the
//! worker pool owns the single [`QueueReceiver`]. Nothing is deduplicated here; repeated
//! URLs are resolved when the file is created.

use tokio::sync::mpsc;
use tracing::warn;

/// A photo URL on its way to disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Photo URL to download
    pub url: String,
    /// Hostname of the feed that discovered the photo (log context only)
    pub hostname: String,
}

/// Producer side of the download queue
#[derive(Clone, Debug)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<DownloadTask>,
}

/// Consumer side of the download queue
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<DownloadTask>,
}

/// Create a connected sender/receiver pair
pub fn channel() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

impl QueueSender {
    /// Enqueue a photo URL without waiting
    ///
    /// Returns `false` when the receiving side is gone; the task is dropped and logged.
    pub fn push(&self, hostname: &str, url: &str) -> bool {
        let task = DownloadTask {
            url: url.to_string(),
            hostname: hostname.to_string(),
        };
        match self.tx.send(task) {
            Ok(()) => true,
            Err(mpsc::error::SendError(task)) => {
                warn!(
                    hostname = %task.hostname,
                    url = %task.url,
                    "Download queue closed, dropping photo"
                );
                false
            }
        }
    }
}

impl QueueReceiver {
    /// Wait for the next task; `None` once every sender has been dropped and the queue
    /// is drained
    pub async fn recv(&mut self) -> Option<DownloadTask> {
        self.rx.recv().await
    }
}
