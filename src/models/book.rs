//! Book channel models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::HEARTBEAT;
use crate::{BfxError, Result};

/// One `[price, count, amount]` entry of a book update.
///
/// `count == 0` removes the level; a positive `amount` is a bid, a
/// negative one an ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(Decimal, i64, Decimal)")]
pub struct BookEntry {
    pub price: Decimal,
    pub count: i64,
    pub amount: Decimal,
}

impl From<(Decimal, i64, Decimal)> for BookEntry {
    fn from((price, count, amount): (Decimal, i64, Decimal)) -> Self {
        Self {
            price,
            count,
            amount,
        }
    }
}

/// A price level as written to snapshots: `[price, count, amount]` with
/// JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotLevel(
    #[serde(with = "rust_decimal::serde::float")] pub Decimal,
    pub i64,
    #[serde(with = "rust_decimal::serde::float")] pub Decimal,
);

/// Payload of a message on a book channel.
#[derive(Debug, Clone, PartialEq)]
pub enum BookPayload {
    /// `"hb"`: the channel is alive, nothing changed.
    Heartbeat,
    /// Any other string marker (e.g. `"cs"` checksums), not interpreted.
    Marker(String),
    /// Entries to apply in order. May be empty during maintenance.
    Entries(Vec<BookEntry>),
}

impl BookPayload {
    /// Decodes and normalizes a book payload.
    ///
    /// Bitfinex abbreviates a single-entry update to the bare
    /// `[price, count, amount]` tuple; that form is wrapped into a
    /// one-element list here.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::MalformedMessage`] if the payload is neither a
    /// string marker nor a (list of) three-element numeric tuple(s).
    pub fn from_value(payload: Value) -> Result<Self> {
        match payload {
            Value::String(marker) if marker == HEARTBEAT => Ok(BookPayload::Heartbeat),
            Value::String(marker) => Ok(BookPayload::Marker(marker)),
            Value::Array(items) if items.is_empty() => Ok(BookPayload::Entries(Vec::new())),
            Value::Array(items) => {
                let wrapped = !items[0].is_array();
                let payload = Value::Array(items);
                let entries = if wrapped {
                    vec![parse_entry(payload)?]
                } else {
                    serde_json::from_value(payload)
                        .map_err(|e| BfxError::MalformedMessage(format!("book entries: {e}")))?
                };
                Ok(BookPayload::Entries(entries))
            }
            other => Err(BfxError::MalformedMessage(format!(
                "unexpected book payload: {other}"
            ))),
        }
    }
}

fn parse_entry(value: Value) -> Result<BookEntry> {
    serde_json::from_value(value).map_err(|e| BfxError::MalformedMessage(format!("book entry: {e}")))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn heartbeat_marker() {
        assert_eq!(BookPayload::from_value(json!("hb")).unwrap(), BookPayload::Heartbeat);
    }

    #[test]
    fn other_markers_are_kept_verbatim() {
        assert_eq!(
            BookPayload::from_value(json!("cs")).unwrap(),
            BookPayload::Marker("cs".to_string())
        );
    }

    #[test]
    fn single_tuple_is_wrapped() {
        let payload = BookPayload::from_value(json!([50, 2, 7])).unwrap();
        assert_eq!(
            payload,
            BookPayload::Entries(vec![BookEntry {
                price: dec!(50),
                count: 2,
                amount: dec!(7),
            }])
        );
    }

    #[test]
    fn list_of_tuples_keeps_order() {
        let payload =
            BookPayload::from_value(json!([[7254.7, 3, 3.3], [7255.1, 1, -0.25]])).unwrap();
        let BookPayload::Entries(entries) = payload else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].price, dec!(7254.7));
        assert_eq!(entries[0].amount, dec!(3.3));
        assert_eq!(entries[1].price, dec!(7255.1));
        assert_eq!(entries[1].amount, dec!(-0.25));
    }

    #[test]
    fn empty_list_is_valid() {
        assert_eq!(
            BookPayload::from_value(json!([])).unwrap(),
            BookPayload::Entries(Vec::new())
        );
    }

    #[test]
    fn short_tuple_is_malformed() {
        let err = BookPayload::from_value(json!([100, 1])).unwrap_err();
        assert!(matches!(err, BfxError::MalformedMessage(_)));
    }

    #[test]
    fn object_payload_is_malformed() {
        assert!(BookPayload::from_value(json!({"price": 1})).is_err());
    }

    #[test]
    fn snapshot_level_serializes_as_numbers() {
        let level = SnapshotLevel(dec!(100.5), 2, dec!(-0.25));
        assert_eq!(serde_json::to_string(&level).unwrap(), "[100.5,2,-0.25]");
    }
}
