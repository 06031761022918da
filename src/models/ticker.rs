//! Ticker listing returned by `GET /v2/tickers?symbols=ALL`.
//!
//! Each row is a positional array. Trading pairs (`t` prefix) use the
//! layout `[SYMBOL, BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE,
//! DAILY_CHANGE_RELATIVE, LAST_PRICE, VOLUME, HIGH, LOW]`; funding
//! currencies (`f` prefix) use a different, longer layout.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{BfxError, Result};

/// Symbol prefix of spot trading pairs.
pub const TRADING_PREFIX: char = 't';

const SYMBOL_INDEX: usize = 0;
const LAST_PRICE_INDEX: usize = 7;
const VOLUME_INDEX: usize = 8;

/// The fields of a trading-pair ticker this crate uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: Decimal,
    /// 24h volume in the pair's base currency.
    pub volume: Decimal,
}

impl Ticker {
    #[must_use]
    pub fn new(symbol: &str, last_price: Decimal, volume: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_price,
            volume,
        }
    }

    /// Returns the symbol of a raw ticker row, if it has one.
    pub fn row_symbol(row: &Value) -> Option<&str> {
        row.get(SYMBOL_INDEX).and_then(Value::as_str)
    }

    /// Parses a trading-pair ticker row.
    ///
    /// `null` price or volume fields count as zero.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::MalformedMessage`] if the row is too short or a
    /// field has the wrong type.
    pub fn from_row(row: &Value) -> Result<Self> {
        let symbol = Self::row_symbol(row)
            .ok_or_else(|| BfxError::MalformedMessage(format!("ticker without symbol: {row}")))?;

        Ok(Self {
            symbol: symbol.to_string(),
            last_price: decimal_field(row, symbol, LAST_PRICE_INDEX)?,
            volume: decimal_field(row, symbol, VOLUME_INDEX)?,
        })
    }
}

fn decimal_field(row: &Value, symbol: &str, index: usize) -> Result<Decimal> {
    match row.get(index) {
        Some(Value::Null) => Ok(Decimal::ZERO),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            BfxError::MalformedMessage(format!("ticker {symbol} field {index}: {e}"))
        }),
        None => Err(BfxError::MalformedMessage(format!(
            "ticker {symbol} has no field {index}"
        ))),
    }
}
