//! Configuration types for photoblog-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Largest page size the feed API accepts
pub const MAX_PAGE_SIZE: usize = 50;

/// Feed scanning settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Time between the end of one tick and the start of the next (default: 30 minutes)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Posts requested per page (default: 20, at most [`MAX_PAGE_SIZE`])
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            page_size: default_page_size(),
        }
    }
}

/// Download worker settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum photos downloading at the same time (default: 8)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
        }
    }
}

/// HTTP client settings shared by the feed fetcher and the download workers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the feed API (default: "https://api.tumblr.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Whole-request timeout for feed pages; connect timeout only for photo downloads
    /// (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for [`PhotoSync`](crate::PhotoSync)
///
/// Fields are organized into logical sub-configs:
/// - [`sync`](SyncConfig): tick interval, page size
/// - [`download`](DownloadConfig): worker concurrency
/// - [`http`](HttpConfig): API endpoint, timeouts, user agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Opaque API token passed through to the feed API
    pub api_token: String,

    /// Hostnames of the blogs to poll (at least one required)
    pub feeds: Vec<String>,

    /// Directory photos are written to (default: "./photos")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Feed scanning settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Download worker settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            feeds: Vec::new(),
            output_dir: default_output_dir(),
            sync: SyncConfig::default(),
            download: DownloadConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from the three values a deployment has to provide
    ///
    /// `hostnames` is a comma-separated list; see [`parse_hostnames`]. The result is
    /// validated.
    pub fn from_parts(
        api_token: impl Into<String>,
        hostnames: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let config = Self {
            api_token: api_token.into(),
            feeds: parse_hostnames(hostnames),
            output_dir: output_dir.into(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting the core relies on
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::config("api_token", "api_token must be non-empty"));
        }
        if self.feeds.is_empty() {
            return Err(Error::config("feeds", "at least one feed hostname is required"));
        }
        if let Some(pos) = self.feeds.iter().position(|h| h.trim().is_empty()) {
            return Err(Error::config(
                "feeds",
                format!("feed hostname at position {pos} is empty"),
            ));
        }
        if let Some(hostname) = self.feeds.iter().find(|h| !is_valid_hostname(h)) {
            return Err(Error::config(
                "feeds",
                format!("feed hostname '{hostname}' is not a valid hostname"),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir", "output_dir must be non-empty"));
        }
        if self.sync.poll_interval.is_zero() {
            return Err(Error::config(
                "sync.poll_interval",
                "poll_interval must be greater than zero",
            ));
        }
        if self.sync.page_size == 0 || self.sync.page_size > MAX_PAGE_SIZE {
            return Err(Error::config(
                "sync.page_size",
                format!("page_size must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "download.max_concurrent_downloads",
                "max_concurrent_downloads must be greater than zero",
            ));
        }
        if url::Url::parse(&self.http.api_base).is_err() {
            return Err(Error::config(
                "http.api_base",
                format!("api_base '{}' is not a valid URL", self.http.api_base),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated hostname list, trimming blanks and dropping empty entries
pub fn parse_hostnames(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// A hostname becomes one path segment of the API URL, so it must not carry path,
/// query or fragment syntax
fn is_valid_hostname(hostname: &str) -> bool {
    !matches!(hostname, "." | "..")
        && !hostname
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '%'))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./photos")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_page_size() -> usize {
    crate::sync_engine::DEFAULT_PAGE_SIZE
}

fn default_max_concurrent() -> usize {
    8
}

fn default_api_base() -> String {
    "https://api.tumblr.com".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("photoblog-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
