//! Crate-level error types.
//!
//! [`BfxError`] unifies every error source (configuration, WebSocket,
//! REST, JSON, recording) behind a single enum. Protocol violations get
//! their own variants so the connection supervisor can tell a desync apart
//! from a transport failure while still tearing the connection down.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BfxError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum BfxError {
    /// An environment variable held an invalid value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The ticker REST request failed or timed out.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the recording failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A message did not have the shape the protocol requires.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A data message referenced a channel id with no `subscribed` ack.
    #[error("protocol desync: unknown channel id {chan_id}")]
    Desync { chan_id: u64 },

    /// The ticker listing produced nothing to subscribe to.
    #[error("no tradable symbols in ticker listing")]
    NoSymbols,
}
