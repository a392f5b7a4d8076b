//! Top-level wiring: config → fetcher, scheduler, queue and worker pool.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{ApiFetcher, FeedSource};
use crate::queue;
use crate::saver::{PoolStats, Saver, WorkerPool};
use crate::scheduler::Scheduler;
use crate::sync_engine::Feed;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A configured photo sync, ready to run
///
/// Watermarks live only in memory: every run starts by bootstrapping each feed.
pub struct PhotoSync {
    config: Config,
    source: Arc<dyn FeedSource>,
    saver: Arc<Saver>,
}

impl PhotoSync {
    /// Validate `config`, create the output directory and build the HTTP clients
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an invalid configuration, [`Error::Io`] if the output
    /// directory cannot be created, or an error if an HTTP client cannot be built.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source: Arc<dyn FeedSource> =
            Arc::new(ApiFetcher::new(&config.http, config.api_token.clone())?);
        Self::assemble(config, source).await
    }

    /// Like [`new`](Self::new) but pages come from `source` instead of the blog API
    ///
    /// # Errors
    /// Same as [`new`](Self::new).
    pub async fn with_source(config: Config, source: Arc<dyn FeedSource>) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, source).await
    }

    /// Create the output directory and the saver for an already validated config
    async fn assemble(config: Config, source: Arc<dyn FeedSource>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create output directory {}: {}",
                        config.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let saver = Arc::new(Saver::new(&config.http, config.output_dir.clone())?);

        Ok(Self {
            config,
            source,
            saver,
        })
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Poll every configured feed until `shutdown` is cancelled
    ///
    /// After shutdown the queue is closed and the downloads already queued are allowed
    /// to finish. Returns the download counts.
    pub async fn run(self, shutdown: CancellationToken) -> PoolStats {
        let (tx, rx) = queue::channel();
        let pool = WorkerPool::spawn(
            Arc::clone(&self.saver),
            rx,
            self.config.download.max_concurrent_downloads,
        );

        let feeds = self.config.feeds.iter().map(Feed::new).collect();
        let scheduler = Scheduler::new(
            feeds,
            self.source,
            tx,
            self.config.sync.poll_interval,
            self.config.sync.page_size,
        );

        info!(
            feeds = self.config.feeds.len(),
            output_dir = %self.config.output_dir.display(),
            "Photo sync started"
        );

        scheduler.run(shutdown).await;
        let stats = pool.join().await;

        info!(
            saved = stats.saved,
            skipped = stats.skipped,
            failed = stats.failed,
            "Photo sync stopped"
        );
        stats
    }
}
