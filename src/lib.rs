//! Bitfinex WebSocket v2 market-data recorder.
//!
//! Picks the most traded spot pairs under the exchange's channel limit,
//! tracks the server-assigned channel ids, rebuilds one order book per
//! `book` channel from delta updates and records everything, including
//! periodic state snapshots, as line-delimited JSON.

pub mod config;
pub mod error;
pub mod models;
pub mod orderbook;
pub mod recorder;
pub mod selector;
pub mod state;
pub mod websocket;

pub use error::{BfxError, Result};
