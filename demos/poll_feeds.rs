//! Poll a set of photo blogs into a local directory
//!
//! Reads its settings from the environment (a `.env` file is loaded if present):
//! - `PHOTOBLOG_API_TOKEN` - API key for the blog API
//! - `PHOTOBLOG_HOSTNAMES` - comma-separated blog hostnames
//! - `PHOTOBLOG_DIR` - output directory (default: `./photos`)
//! - `PHOTOBLOG_INTERVAL_SECS` - poll interval in seconds (optional)
//!
//! Log verbosity follows `RUST_LOG`, e.g. `RUST_LOG=photoblog_dl=debug`.
//!
//! Run with `cargo run --example poll_feeds`, stop with Ctrl+C.

use photoblog_dl::{Config, PhotoSync, run_with_shutdown};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = std::env::var("PHOTOBLOG_API_TOKEN")
        .map_err(|_| "PHOTOBLOG_API_TOKEN not set in environment")?;
    let hostnames = std::env::var("PHOTOBLOG_HOSTNAMES")
        .map_err(|_| "PHOTOBLOG_HOSTNAMES not set in environment")?;
    let output_dir = std::env::var("PHOTOBLOG_DIR").unwrap_or_else(|_| "photos".to_string());

    let mut config = Config::from_parts(token, &hostnames, output_dir)?;
    if let Some(secs) = std::env::var("PHOTOBLOG_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config.sync.poll_interval = Duration::from_secs(secs);
    }

    println!(
        "Polling {} feed(s) every {}s into {}",
        config.feeds.len(),
        config.sync.poll_interval.as_secs(),
        config.output_dir.display()
    );

    let sync = PhotoSync::new(config).await?;
    let stats = run_with_shutdown(sync).await;

    println!(
        "Stopped: {} saved, {} skipped, {} failed",
        stats.saved, stats.skipped, stats.failed
    );
    Ok(())
}
