//! # photoblog-dl
//!
//! Keeps a local directory in sync with the photos posted to a set of photo blogs.
//!
//! Each blog (a *feed*) is polled on a fixed interval. A poll walks the feed newest
//! first and stops at the newest post seen by the previous poll (the *watermark*), so
//! only new posts are looked at. The first poll of a feed only records the watermark;
//! the existing backlog is never downloaded. Discovered photo URLs go through a queue to
//! a bounded pool of download workers that never overwrite an existing file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use photoblog_dl::{Config, PhotoSync, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_parts("api-token", "demo.example.com,other.example.com", "./photos")?;
//!
//!     let sync = PhotoSync::new(config).await?;
//!     let stats = run_with_shutdown(sync).await;
//!     println!("saved {} photos", stats.saved);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Feed page retrieval from the blog API
pub mod fetcher;
/// Top-level wiring
pub mod photo_sync;
/// Download queue between scans and workers
pub mod queue;
/// Photo download workers
pub mod saver;
/// Tick-based scheduling of feed scans
pub mod scheduler;
/// Incremental feed scanning
pub mod sync_engine;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, HttpConfig, SyncConfig};
pub use error::{DownloadError, Error, FetchError, Result};
pub use fetcher::{ApiFetcher, FeedSource};
pub use photo_sync::PhotoSync;
pub use saver::{PoolStats, Saver, WorkerPool};
pub use scheduler::{Scheduler, TickReport};
pub use sync_engine::Feed;
pub use types::{
    Page, Photo, PhotoVariant, Post, PostId, SaveOutcome, ScanEnd, ScanReport, ScanState,
};

use tokio_util::sync::CancellationToken;

/// Run a [`PhotoSync`] until the process receives a termination signal.
///
/// On the signal the scheduler stops after its current tick and the downloads already
/// queued are finished before this returns.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to whichever one can be registered.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use photoblog_dl::{Config, PhotoSync, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_parts("api-token", "demo.example.com", "./photos")?;
///     let sync = PhotoSync::new(config).await?;
///
///     let stats = run_with_shutdown(sync).await;
///     println!("saved={} skipped={} failed={}", stats.saved, stats.skipped, stats.failed);
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(sync: PhotoSync) -> PoolStats {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown requested, finishing current tick");
        trigger.cancel();
    });

    let stats = sync.run(shutdown).await;
    signal_task.abort();
    stats
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
