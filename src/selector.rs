//! Symbol selection under the per-connection channel limit.
//!
//! Bitfinex lists far more pairs than one connection may subscribe to, so
//! the recorder keeps the pairs with the highest 24h volume. Raw volumes
//! are in the base currency (`tETHBTC` volume is in ETH) and are converted
//! to USD through the base's `t<BASE>USD` last price before ranking.

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::SubscribeRequest;
use crate::models::ticker::{TRADING_PREFIX, Ticker};
use crate::{BfxError, Result};

/// Fetches the full ticker listing and keeps the trading pairs.
///
/// # Errors
///
/// Returns [`BfxError::Http`] if the request fails, times out, or the
/// server answers with an error status, and
/// [`BfxError::MalformedMessage`] if a trading-pair row cannot be parsed.
pub async fn fetch_tickers(rest_url: &str, timeout: Duration) -> Result<Vec<Ticker>> {
    info!("Retrieving market volumes");

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(format!("{rest_url}/tickers"))
        .query(&[("symbols", "ALL")])
        .send()
        .await?
        .error_for_status()?;
    let rows: Vec<Value> = response.json().await?;

    let tickers = parse_tickers(&rows)?;
    info!(rows = rows.len(), pairs = tickers.len(), "Retrieved tickers");

    Ok(tickers)
}

/// Keeps the spot trading-pair rows of a raw listing and parses them.
///
/// Funding rows (`f` prefix) have a different layout and are skipped
/// before parsing.
///
/// # Errors
///
/// Returns [`BfxError::MalformedMessage`] if a trading-pair row cannot be
/// parsed.
pub fn parse_tickers(rows: &[Value]) -> Result<Vec<Ticker>> {
    rows.iter()
        .filter(|row| Ticker::row_symbol(row).is_some_and(|s| s.starts_with(TRADING_PREFIX)))
        .map(Ticker::from_row)
        .collect()
}

/// Base currency of a trading pair: `XXX` in `tXXXYYY`.
fn base_currency(symbol: &str) -> &str {
    let pair = symbol.strip_prefix(TRADING_PREFIX).unwrap_or(symbol);
    pair.get(..3).unwrap_or(pair)
}

/// Long ticker of a colon-separated pair: `AVAX` in `tAVAX:USD`.
fn long_base_currency(symbol: &str) -> Option<&str> {
    let pair = symbol.strip_prefix(TRADING_PREFIX).unwrap_or(symbol);
    pair.split_once(':').map(|(base, _)| base)
}

/// Last USD price of the base currency of `symbol`.
///
/// `t<XXX>USD` is looked up first. Colon-separated pairs whose three-letter
/// base has no USD market fall back to `t<BASE>USD` and `t<BASE>:USD` for
/// their full base ticker.
fn usd_price(prices: &HashMap<&str, Decimal>, symbol: &str) -> Option<Decimal> {
    let primary = format!("{TRADING_PREFIX}{}USD", base_currency(symbol));
    if let Some(price) = prices.get(primary.as_str()) {
        return Some(*price);
    }

    let base = long_base_currency(symbol)?;
    [
        format!("{TRADING_PREFIX}{base}USD"),
        format!("{TRADING_PREFIX}{base}:USD"),
    ]
    .iter()
    .find_map(|candidate| prices.get(candidate.as_str()).copied())
}

/// 24h volume of every trading pair in USD, in listing order.
///
/// Expects the spot pairs kept by [`parse_tickers`]. Pairs whose base
/// currency has no USD market get zero volume.
pub fn usd_volumes(tickers: &[Ticker]) -> Vec<(String, Decimal)> {
    let prices: HashMap<&str, Decimal> = tickers
        .iter()
        .map(|t| (t.symbol.as_str(), t.last_price))
        .collect();

    tickers
        .iter()
        .map(|t| {
            let volume = match usd_price(&prices, &t.symbol) {
                Some(price) => t.volume.checked_mul(price).unwrap_or(Decimal::MAX),
                None => {
                    warn!(
                        symbol = t.symbol,
                        "Could not find USD market to calculate volume"
                    );
                    Decimal::ZERO
                }
            };
            (t.symbol.clone(), volume)
        })
        .collect()
}

/// Picks the `channel_limit / 2` pairs with the highest USD volume.
///
/// Half of the limit goes to trades channels and half to book channels.
/// Equal volumes keep their listing order.
pub fn select_symbols(tickers: &[Ticker], channel_limit: usize) -> Vec<String> {
    let mut ranked = usd_volumes(tickers);
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(channel_limit / 2)
        .map(|(symbol, _)| symbol)
        .collect()
}

/// Subscription requests for the selected symbols: every trades channel
/// first, then every book channel, both in rank order.
pub fn subscription_requests(symbols: &[String]) -> Vec<SubscribeRequest> {
    symbols
        .iter()
        .map(|s| SubscribeRequest::trades(s))
        .chain(symbols.iter().map(|s| SubscribeRequest::book(s)))
        .collect()
}

/// Selects symbols and builds the serialized subscription messages to send
/// once per connection.
///
/// # Errors
///
/// Returns [`BfxError::NoSymbols`] if the listing holds no trading pair,
/// and [`BfxError::Json`] if a request cannot be serialized.
pub fn subscription_messages(tickers: &[Ticker], channel_limit: usize) -> Result<Vec<String>> {
    let symbols = select_symbols(tickers, channel_limit);
    if symbols.is_empty() {
        return Err(BfxError::NoSymbols);
    }
    info!(?symbols, "Selected symbols");

    subscription_requests(&symbols)
        .iter()
        .map(|request| serde_json::to_string(request).map_err(BfxError::from))
        .collect()
}
