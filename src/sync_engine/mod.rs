//! Incremental feed scanning.
//!
//! Each tick the scheduler runs one [`scan`] per [`Feed`]. A scan walks the feed
//! newest-first, page by page, and pushes the photo URLs of every post newer than the
//! feed's watermark onto the download queue. It stops at the first post whose id is at
//! or below the watermark, or at an empty page.
//!
//! A feed without a watermark is bootstrapped: the scan reads only the first page, emits
//! nothing, and proposes the newest post id as the watermark. This keeps a new feed (or
//! one that was reset after a failure) from downloading its whole history.
//!
//! The scan never mutates the feed. It returns the watermark the feed should hold in its
//! [`ScanReport`] and the owner applies it with [`Feed::apply_scan`].

use crate::error::FetchError;
use crate::fetcher::FeedSource;
use crate::queue::QueueSender;
use crate::types::{PostId, ScanEnd, ScanReport, ScanState};
use tracing::{debug, info, warn};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One polled blog and its sync cursor
#[derive(Clone, Debug)]
pub struct Feed {
    hostname: String,
    watermark: Option<PostId>,
    state: ScanState,
}

impl Feed {
    /// A feed that has never been scanned
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            watermark: None,
            state: ScanState::Idle,
        }
    }

    /// A feed resuming from a known watermark
    pub fn with_watermark(hostname: impl Into<String>, watermark: PostId) -> Self {
        Self {
            watermark: Some(watermark),
            ..Self::new(hostname)
        }
    }

    /// Blog hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Newest post id already processed, if any
    pub fn watermark(&self) -> Option<PostId> {
        self.watermark
    }

    /// State of the most recent scan
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Mark the feed as being scanned
    pub(crate) fn begin_scan(&mut self) {
        self.state = ScanState::Scanning;
    }

    /// Adopt the watermark proposed by a successful scan
    pub fn apply_scan(&mut self, report: &ScanReport) {
        if report.watermark != self.watermark {
            info!(
                hostname = %self.hostname,
                from = ?self.watermark.map(|w| w.get()),
                to = ?report.watermark.map(|w| w.get()),
                "Watermark updated"
            );
            self.watermark = report.watermark;
        }
        self.state = ScanState::Done;
    }

    /// Forget the watermark after a failed scan so the next tick bootstraps again
    pub fn reset(&mut self) {
        self.watermark = None;
        self.state = ScanState::Failed;
    }
}

/// Scan `feed` once and queue the photos of every post newer than its watermark
///
/// Photos are queued newest post first, in photo order within a post.
///
/// # Errors
/// Returns the first [`FetchError`]. URLs queued before the failure stay queued; the
/// caller decides what happens to the watermark.
pub async fn scan(
    feed: &Feed,
    source: &dyn FeedSource,
    queue: &QueueSender,
    page_size: usize,
) -> Result<ScanReport, FetchError> {
    let hostname = feed.hostname();
    let watermark = feed.watermark();

    debug!(
        hostname = %hostname,
        watermark = ?watermark.map(|w| w.get()),
        "Scanning feed"
    );

    let mut offset = 0;
    let mut first_seen: Option<PostId> = None;
    let mut pages_fetched = 0;
    let mut urls_queued = 0;

    let end = 'scan: loop {
        let page = source.fetch_page(hostname, page_size, offset).await?;
        pages_fetched += 1;

        if page.is_empty() {
            debug!(hostname = %hostname, offset, "No more posts");
            break ScanEnd::Exhausted;
        }

        if first_seen.is_none() {
            first_seen = Some(page.posts[0].id);
        }

        let Some(watermark) = watermark else {
            break ScanEnd::Bootstrapped;
        };

        for post in &page.posts {
            if post.id == watermark {
                break 'scan ScanEnd::ReachedWatermark;
            }
            if post.id < watermark {
                warn!(
                    hostname = %hostname,
                    watermark = watermark.get(),
                    post_id = post.id.get(),
                    "Passed watermark without reaching it, stopping scan"
                );
                break 'scan ScanEnd::PassedWatermark;
            }
            for photo in &post.photos {
                if queue.push(hostname, photo.canonical_url()) {
                    urls_queued += 1;
                }
            }
        }

        offset += page_size;
    };

    let report = ScanReport {
        end,
        watermark: first_seen.or(watermark),
        pages_fetched,
        urls_queued,
    };

    debug!(
        hostname = %hostname,
        end = ?report.end,
        pages = report.pages_fetched,
        queued = report.urls_queued,
        "Scan finished"
    );

    Ok(report)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
