//! Photo download workers.
//!
//! [`Saver`] turns one URL into one file. The output file is opened with exclusive
//! create before anything is fetched, so the existence of the file is the only
//! deduplication signal: a second save of the same name is a cheap no-op, and two
//! workers racing on the same name cannot both write it.
//!
//! [`WorkerPool`] drains the download queue with a bounded number of concurrent saves.

use crate::config::HttpConfig;
use crate::error::{DownloadError, Error, Result};
use crate::queue::{DownloadTask, QueueReceiver};
use crate::types::SaveOutcome;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Derive the output file name from the last path segment of `url`
///
/// Returns `None` when the URL does not parse or the segment is empty, `.` or `..`.
/// The query string and fragment are not part of the name.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    match segment {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Downloads single photos into the output directory
pub struct Saver {
    http_client: reqwest::Client,
    output_dir: PathBuf,
}

impl Saver {
    /// Create a saver writing into `output_dir`
    ///
    /// The directory is not created here; see [`PhotoSync::new`](crate::PhotoSync::new).
    ///
    /// `http.timeout` only bounds connection setup. A download that has started runs
    /// until it completes or fails, since an aborted body would leave a truncated file
    /// that later saves skip.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(http: &HttpConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(http.timeout)
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            output_dir: output_dir.into(),
        })
    }

    /// Directory files are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download `url` into `<output_dir>/<last path segment>` unless that file exists
    ///
    /// A failed download leaves the created file in place; since the file then exists,
    /// later saves of the same name are skipped.
    ///
    /// # Errors
    /// Returns [`DownloadError`] when the name cannot be derived, the file cannot be
    /// created, or fetching/writing fails.
    pub async fn save(&self, url: &str) -> std::result::Result<SaveOutcome, DownloadError> {
        let name = filename_from_url(url).ok_or_else(|| DownloadError::InvalidUrl {
            url: url.to_string(),
        })?;
        let path = self.output_dir.join(name);

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(url = %url, path = %path.display(), "File exists, skipping");
                return Ok(SaveOutcome::SkipExisting { path });
            }
            Err(source) => return Err(DownloadError::Create { path, source }),
        };

        let mut response =
            self.http_client
                .get(url)
                .send()
                .await
                .map_err(|source| DownloadError::Transport {
                    url: url.to_string(),
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| DownloadError::Transport {
                url: url.to_string(),
                source,
            })?
        {
            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::Write {
                    path: path.clone(),
                    source,
                })?;
            bytes += chunk.len() as u64;
        }

        file.flush().await.map_err(|source| DownloadError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(SaveOutcome::Saved { path, bytes })
    }
}

/// Counts of finished downloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Photos written to new files
    pub saved: u64,
    /// Photos skipped because the file already existed
    pub skipped: u64,
    /// Photos that failed
    pub failed: u64,
}

impl PoolStats {
    /// Total number of finished downloads
    pub fn finished(&self) -> u64 {
        self.saved + self.skipped + self.failed
    }
}

#[derive(Debug, Default)]
struct Counters {
    saved: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            saved: self.saved.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Bounded pool of download workers draining the queue
///
/// A dispatcher task receives [`DownloadTask`]s and spawns one save per task once a
/// permit is free, so at most `max_concurrent` downloads run at a time. The dispatcher
/// stops when every queue sender is gone, then waits for in-flight saves.
pub struct WorkerPool {
    handle: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Start draining `queue` with at most `max_concurrent` simultaneous downloads
    ///
    /// A `max_concurrent` of zero is treated as one.
    pub fn spawn(saver: Arc<Saver>, mut queue: QueueReceiver, max_concurrent: usize) -> Self {
        let counters = Arc::new(Counters::default());
        let limit = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let task_counters = Arc::clone(&counters);

        let handle = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();

            while let Some(task) = queue.recv().await {
                let permit = match Arc::clone(&limit).acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        error!("Download limiter closed, stopping worker pool");
                        break;
                    }
                };

                let saver = Arc::clone(&saver);
                let counters = Arc::clone(&task_counters);
                in_flight.spawn(async move {
                    let _permit = permit;
                    save_and_record(&saver, &counters, task).await;
                });

                // Reap finished saves so the set does not grow with the queue
                while let Some(joined) = in_flight.try_join_next() {
                    record_panic(joined, &task_counters);
                }
            }

            while let Some(joined) = in_flight.join_next().await {
                record_panic(joined, &task_counters);
            }

            let stats = task_counters.snapshot();
            info!(
                saved = stats.saved,
                skipped = stats.skipped,
                failed = stats.failed,
                "Download queue closed, worker pool stopped"
            );
        });

        Self { handle, counters }
    }

    /// Counts of downloads finished so far
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Wait until the queue is closed and drained, then return the final counts
    pub async fn join(self) -> PoolStats {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Worker pool task ended abnormally");
        }
        self.counters.snapshot()
    }
}

async fn save_and_record(saver: &Saver, counters: &Counters, task: DownloadTask) {
    match saver.save(&task.url).await {
        Ok(SaveOutcome::Saved { path, bytes }) => {
            counters.saved.fetch_add(1, Ordering::Relaxed);
            info!(
                hostname = %task.hostname,
                url = %task.url,
                path = %path.display(),
                bytes,
                "Saved photo"
            );
        }
        Ok(SaveOutcome::SkipExisting { .. }) => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                hostname = %task.hostname,
                url = %task.url,
                error = %e,
                "Failed to save photo"
            );
        }
    }
}

fn record_panic(joined: std::result::Result<(), tokio::task::JoinError>, counters: &Counters) {
    if let Err(e) = joined {
        counters.failed.fetch_add(1, Ordering::Relaxed);
        error!(error = %e, "Download task panicked");
    }
}
