//! Shared test utilities and constants.

use std::time::Duration;

/// Bitfinex WebSocket v2 public endpoint URL.
pub const BITFINEX_WS_URL: &str = "wss://api-pub.bitfinex.com/ws/2";

/// Bitfinex REST v2 public endpoint URL.
pub const BITFINEX_REST_URL: &str = "https://api-pub.bitfinex.com/v2";

/// Timeout for the ticker listing in live tests.
pub const TICKER_TIMEOUT: Duration = Duration::from_secs(5);
