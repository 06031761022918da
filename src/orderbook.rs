//! Order book reconstruction from Bitfinex book deltas.
//!
//! Levels are keyed by price and carry the number of aggregated orders and
//! a signed amount: positive for bids, negative for asks. Deltas can
//! arrive out of order, so inserting a level first purges the levels on
//! the opposite side that it proves stale.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::book::{BookEntry, SnapshotLevel};

/// An aggregated resting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub count: i64,
    pub amount: Decimal,
}

impl PriceLevel {
    /// Returns `true` for a buy-side level. Zero amounts count as bids.
    pub fn is_bid(&self) -> bool {
        self.amount >= Decimal::ZERO
    }
}

/// One reconstructed order book, sorted by price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl OrderBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the entries of one update, in order.
    pub fn apply_all(&mut self, entries: &[BookEntry]) {
        for entry in entries {
            self.apply(entry);
        }
    }

    /// Applies a single delta entry.
    ///
    /// A zero count removes the level. Otherwise the level is inserted or
    /// replaced, after dropping every bid at or above a new ask price, or
    /// every ask at or below a new bid price. Both bounds are inclusive.
    pub fn apply(&mut self, entry: &BookEntry) {
        let BookEntry {
            price,
            count,
            amount,
        } = *entry;

        if count == 0 {
            self.levels.remove(&price);
            return;
        }

        if amount < Decimal::ZERO {
            self.levels.retain(|level_price, level| {
                !(*level_price >= price && level.amount >= Decimal::ZERO)
            });
        } else {
            self.levels.retain(|level_price, level| {
                !(*level_price <= price && level.amount <= Decimal::ZERO)
            });
        }

        self.levels.insert(price, PriceLevel { count, amount });
    }

    pub fn get(&self, price: &Decimal) -> Option<&PriceLevel> {
        self.levels.get(price)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterates levels in ascending price order.
    pub fn iter(&self) -> impl Iterator<Item = (&Decimal, &PriceLevel)> {
        self.levels.iter()
    }

    /// Highest bid, if any.
    pub fn best_bid(&self) -> Option<(Decimal, PriceLevel)> {
        self.levels
            .iter()
            .rev()
            .find(|(_, level)| level.is_bid())
            .map(|(price, level)| (*price, *level))
    }

    /// Lowest ask, if any.
    pub fn best_ask(&self) -> Option<(Decimal, PriceLevel)> {
        self.levels
            .iter()
            .find(|(_, level)| !level.is_bid())
            .map(|(price, level)| (*price, *level))
    }

    /// The book as `[price, count, amount]` rows, ascending by price.
    pub fn snapshot_levels(&self) -> Vec<SnapshotLevel> {
        self.levels
            .iter()
            .map(|(price, level)| SnapshotLevel(*price, level.count, level.amount))
            .collect()
    }
}
