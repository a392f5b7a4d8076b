//! Core types for photoblog-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of a post, assigned by the remote blog
///
/// Identifiers increase monotonically within one feed; they are not globally unique
/// across feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl PostId {
    /// Create a new PostId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PostId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<PostId> for i64 {
    fn from(id: PostId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One resolution of a photo
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoVariant {
    /// Image URL
    pub url: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A photo attached to a post, with at least one size variant
#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    variants: Vec<PhotoVariant>,
}

impl Photo {
    /// Build a photo from its variants, largest first
    ///
    /// Returns `None` for an empty list: a photo without variants cannot be downloaded.
    pub fn new(variants: Vec<PhotoVariant>) -> Option<Self> {
        if variants.is_empty() {
            None
        } else {
            Some(Self { variants })
        }
    }

    /// The URL that gets downloaded (first listed variant)
    pub fn canonical_url(&self) -> &str {
        &self.variants[0].url
    }

    /// All variants in the order the API listed them
    pub fn variants(&self) -> &[PhotoVariant] {
        &self.variants
    }
}

/// A photo post
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// Post identifier
    pub id: PostId,
    /// Photos in display order
    pub photos: Vec<Photo>,
}

/// One page of posts, newest first
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Posts in the order the API returned them
    pub posts: Vec<Post>,
}

impl Page {
    /// Whether the page carries no posts (end of the feed)
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Lifecycle of one feed scan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// No scan in progress
    Idle,
    /// Walking pages
    Scanning,
    /// Scan finished and produced a report
    Done,
    /// A fetch failed mid-scan
    Failed,
}

/// How a successful scan terminated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanEnd {
    /// No watermark was set; only the starting point was recorded
    Bootstrapped,
    /// Hit the post equal to the watermark
    ReachedWatermark,
    /// Hit a post older than the watermark without seeing the watermark itself
    ///
    /// Either the feed's ordering is broken or the watermark post was deleted upstream.
    PassedWatermark,
    /// Ran out of posts before reaching the watermark
    Exhausted,
}

/// Result of a successful scan
///
/// The scan never writes to the feed; the caller applies `watermark` afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanReport {
    /// How the scan terminated
    pub end: ScanEnd,
    /// Watermark the feed should hold after this scan
    pub watermark: Option<PostId>,
    /// Number of pages requested
    pub pages_fetched: usize,
    /// Number of photo URLs pushed onto the download queue
    pub urls_queued: usize,
}

/// Outcome of a successful save
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The photo was downloaded into a new file
    Saved {
        /// Path of the created file
        path: PathBuf,
        /// Number of bytes written
        bytes: u64,
    },
    /// A file with that name already existed; nothing was fetched
    SkipExisting {
        /// Path of the existing file
        path: PathBuf,
    },
}

impl SaveOutcome {
    /// Path of the file the outcome refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            SaveOutcome::Saved { path, .. } | SaveOutcome::SkipExisting { path } => path,
        }
    }
}
