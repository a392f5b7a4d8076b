//! Tick-based scheduling of feed scans.
//!
//! Every tick the [`Scheduler`] scans all feeds concurrently and waits for every scan to
//! finish before it applies the results. A feed whose scan failed loses its watermark,
//! so its next scan is a bootstrap scan instead of a burst of backlog. The first tick runs
//! as soon as [`Scheduler::run`] starts.

use crate::error::FetchError;
use crate::fetcher::FeedSource;
use crate::queue::QueueSender;
use crate::sync_engine::{self, Feed};
use crate::types::ScanReport;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of one feed's scan within a tick
#[derive(Debug)]
pub struct FeedOutcome {
    /// Feed hostname
    pub hostname: String,
    /// Scan report, or the error that aborted the scan
    pub result: Result<ScanReport, FetchError>,
}

/// Summary of one tick
#[derive(Debug)]
pub struct TickReport {
    /// When the tick started
    pub started_at: DateTime<Utc>,
    /// One entry per feed, in configuration order
    pub outcomes: Vec<FeedOutcome>,
}

impl TickReport {
    /// Number of feeds whose scan failed
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Total photo URLs queued by this tick
    pub fn urls_queued(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.urls_queued)
            .sum()
    }
}

/// Runs all feed scans on a fixed interval
pub struct Scheduler {
    feeds: Vec<Feed>,
    source: Arc<dyn FeedSource>,
    queue: QueueSender,
    interval: Duration,
    page_size: usize,
}

impl Scheduler {
    /// Create a scheduler over `feeds`
    ///
    /// # Parameters
    /// - `source`: where pages come from
    /// - `queue`: where discovered photo URLs go
    /// - `interval`: time between the end of one tick and the start of the next
    /// - `page_size`: posts requested per page
    pub fn new(
        feeds: Vec<Feed>,
        source: Arc<dyn FeedSource>,
        queue: QueueSender,
        interval: Duration,
        page_size: usize,
    ) -> Self {
        Self {
            feeds,
            source,
            queue,
            interval,
            page_size,
        }
    }

    /// Current state of every feed
    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    /// Scan every feed once, concurrently, and apply the results
    ///
    /// Returns only after every scan has finished or failed. Failed feeds are logged and
    /// reset; they never affect the other feeds.
    pub async fn run_tick(&mut self) -> TickReport {
        let started_at = Utc::now();
        info!(feeds = self.feeds.len(), "Starting sync tick");

        for feed in &mut self.feeds {
            feed.begin_scan();
        }

        let source = self.source.as_ref();
        let queue = &self.queue;
        let page_size = self.page_size;
        let results = futures::future::join_all(
            self.feeds
                .iter()
                .map(|feed| sync_engine::scan(feed, source, queue, page_size)),
        )
        .await;

        let mut outcomes = Vec::with_capacity(self.feeds.len());
        for (feed, result) in self.feeds.iter_mut().zip(results) {
            match &result {
                Ok(report) => feed.apply_scan(report),
                Err(e) => {
                    error!(
                        hostname = %feed.hostname(),
                        error = %e,
                        "Feed scan failed, watermark will be reset"
                    );
                    feed.reset();
                }
            }
            outcomes.push(FeedOutcome {
                hostname: feed.hostname().to_string(),
                result,
            });
        }

        let report = TickReport {
            started_at,
            outcomes,
        };
        info!(
            started_at = %report.started_at,
            failed = report.failed(),
            queued = report.urls_queued(),
            "Sync tick finished"
        );
        report
    }

    /// Tick immediately, then once per interval, until `shutdown` is cancelled
    ///
    /// A tick in progress always runs to completion; shutdown is only observed while
    /// waiting for the next tick. Dropping the scheduler on return closes its queue
    /// sender.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            feeds = self.feeds.len(),
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.run_tick().await;

            debug!(interval_secs = self.interval.as_secs(), "Waiting for next tick");
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Scheduler stopped");
    }
}
