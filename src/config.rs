//! Application configuration loaded from environment variables.
//!
//! Every setting has a default, so the recorder runs with no environment
//! at all:
//! - `BFX_WEBSOCKET_URL`: public WebSocket v2 endpoint
//! - `BFX_REST_URL`: public REST v2 base URL, used for the ticker listing
//! - `BFX_CHANNEL_LIMIT`: maximum number of channels per connection
//! - `BFX_DUMP_DIR`: directory receiving the recordings
//! - `BFX_SNAPSHOT_INTERVAL_SECS`: seconds between state snapshots
//! - `BFX_TICKER_TIMEOUT_MS`: timeout of the ticker REST request

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{BfxError, Result};

/// Default public WebSocket endpoint.
const DEFAULT_WEBSOCKET_URL: &str = "wss://api-pub.bitfinex.com/ws/2";

/// Default public REST endpoint.
const DEFAULT_REST_URL: &str = "https://api-pub.bitfinex.com/v2";

/// Number of channels Bitfinex allows one connection to open.
pub const DEFAULT_CHANNEL_LIMIT: usize = 30;

const DEFAULT_DUMP_DIR: &str = "dump";
const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;
const DEFAULT_TICKER_TIMEOUT_MS: u64 = 1000;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bitfinex: BitfinexConfig,
    pub recorder: RecorderConfig,
}

/// Exchange endpoints and limits.
#[derive(Debug, Clone)]
pub struct BitfinexConfig {
    pub websocket_url: String,
    pub rest_url: String,
    pub channel_limit: usize,
    pub ticker_timeout: Duration,
}

/// Where and how often state is recorded.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub dump_dir: PathBuf,
    pub snapshot_interval: Duration,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`BfxError::Config`] if a numeric variable cannot be parsed,
/// or if the channel limit is too small to hold one trades and one book
/// channel.
pub fn fetch_config() -> Result<AppConfig> {
    let websocket_url = non_empty_var("BFX_WEBSOCKET_URL")
        .unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string());
    let rest_url = non_empty_var("BFX_REST_URL")
        .unwrap_or_else(|| DEFAULT_REST_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let channel_limit = parsed_var("BFX_CHANNEL_LIMIT", DEFAULT_CHANNEL_LIMIT)?;
    if channel_limit < 2 {
        return Err(BfxError::Config(format!(
            "BFX_CHANNEL_LIMIT must be at least 2, got {channel_limit}"
        )));
    }

    let ticker_timeout = Duration::from_millis(parsed_var(
        "BFX_TICKER_TIMEOUT_MS",
        DEFAULT_TICKER_TIMEOUT_MS,
    )?);
    let snapshot_interval = Duration::from_secs(parsed_var(
        "BFX_SNAPSHOT_INTERVAL_SECS",
        DEFAULT_SNAPSHOT_INTERVAL_SECS,
    )?);
    if snapshot_interval.is_zero() {
        return Err(BfxError::Config(
            "BFX_SNAPSHOT_INTERVAL_SECS must be greater than zero".to_string(),
        ));
    }

    let dump_dir = non_empty_var("BFX_DUMP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DUMP_DIR));

    Ok(AppConfig {
        bitfinex: BitfinexConfig {
            websocket_url,
            rest_url,
            channel_limit,
            ticker_timeout,
        },
        recorder: RecorderConfig {
            dump_dir,
            snapshot_interval,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses an environment variable, falling back to `default` when unset.
fn parsed_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BfxError::Config(format!("{name} has invalid value {raw:?}"))),
        None => Ok(default),
    }
}
