//! Error types for photoblog-dl
//!
//! This module provides the error taxonomy for the library:
//! - [`FetchError`] for a failed page request against a feed
//! - [`DownloadError`] for a failed photo download
//! - [`Error`] as the crate-level error returned by startup and wiring code
//!
//! Watermark overshoot during a scan is deliberately absent here: it ends a scan
//! cleanly (see [`crate::types::ScanEnd::PassedWatermark`]) instead of failing it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photoblog-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for photoblog-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output_dir")
        key: Option<String>,
    },

    /// A feed page could not be fetched
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A photo could not be downloaded
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (client construction and the like)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error that names the offending key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of a single paginated feed request
///
/// Any of these aborts the current scan of the feed for this tick. There is no retry at
/// the fetch layer; the scheduler resets the feed's watermark and tries again next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The hostname does not form a valid request URL
    #[error("cannot build request URL for {hostname}: {source}")]
    InvalidUrl {
        /// Feed hostname the request was made for
        hostname: String,
        /// URL parse error
        #[source]
        source: url::ParseError,
    },

    /// The request never produced a response (DNS, connect, timeout, body read)
    #[error("request to {hostname} failed: {source}")]
    Transport {
        /// Feed hostname the request was made for
        hostname: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success HTTP status
    #[error("{hostname} returned HTTP {status}")]
    HttpStatus {
        /// Feed hostname the request was made for
        hostname: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body was not the expected JSON document
    #[error("malformed response from {hostname}: {source}")]
    Decode {
        /// Feed hostname the request was made for
        hostname: String,
        /// JSON decoding error
        #[source]
        source: serde_json::Error,
    },

    /// The API embedded a non-200 status in its response envelope
    #[error("API error for {hostname}: {message} (status {status})")]
    Api {
        /// Feed hostname the request was made for
        hostname: String,
        /// Status code from the response envelope
        status: i64,
        /// Status message from the response envelope
        message: String,
    },

    /// A post declared a photo without any size variants
    #[error("post {post_id} on {hostname} has a photo with no size variants")]
    MalformedPhoto {
        /// Feed hostname the post belongs to
        hostname: String,
        /// Identifier of the offending post
        post_id: i64,
    },
}

/// Failure of a single photo download
///
/// Download errors are logged per URL and never touch feed state.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL does not parse or has no usable final path segment
    #[error("cannot derive a file name from {url}")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },

    /// Opening the output file failed for a reason other than "already exists"
    #[error("failed to create {path}: {source}")]
    Create {
        /// Output file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The request failed before or while streaming the body
    #[error("failed to fetch {url}: {source}")]
    Transport {
        /// Photo URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The photo host answered with a non-success HTTP status
    #[error("fetching {url} returned HTTP {status}")]
    HttpStatus {
        /// Photo URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Writing downloaded bytes to disk failed
    #[error("failed to write {path}: {source}")]
    Write {
        /// Output file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
