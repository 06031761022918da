//! Shared models for Bitfinex WebSocket v2 messages.
//!
//! Inbound frames are decoded exactly once into [`InboundMessage`]; the
//! rest of the crate matches on the variant instead of probing JSON fields.
//! Outbound traffic is limited to [`SubscribeRequest`].

pub mod book;
pub mod ticker;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BfxError, Result};

/// Channel name reserved for `info` events.
pub const CHANNEL_INFO: &str = "info";

/// Channel name reserved for events this client does not interpret.
pub const CHANNEL_UNKNOWN: &str = "unknown";

/// Channel name of the snapshot entry holding the name -> id table.
pub const CHANNEL_SUBSCRIBED: &str = "subscribed";

/// Heartbeat marker sent in place of a channel payload.
pub const HEARTBEAT: &str = "hb";

/// Public channels this client subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Trades,
    Book,
}

impl Channel {
    /// Returns the wire-format channel name expected by the Bitfinex API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Trades => "trades",
            Channel::Book => "book",
        }
    }
}

/// Builds the logical channel name `"<kind>_<symbol>"`.
pub fn channel_name(kind: &str, symbol: &str) -> String {
    format!("{kind}_{symbol}")
}

/// Book precision level; `P0` is the most precise aggregation.
const BOOK_PRECISION: &str = "P0";

/// Book update frequency; `F0` is realtime.
const BOOK_FREQUENCY: &str = "F0";

/// Number of price levels per side in the initial book snapshot.
const BOOK_LENGTH: &str = "100";

/// A `subscribe` request sent to the Bitfinex WebSocket API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub event: String,
    pub channel: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<String>,
}

impl SubscribeRequest {
    /// Creates a subscription to the public trades of `symbol`.
    #[must_use]
    pub fn trades(symbol: &str) -> Self {
        Self {
            event: "subscribe".to_string(),
            channel: Channel::Trades.as_str().to_string(),
            symbol: symbol.to_string(),
            prec: None,
            freq: None,
            len: None,
        }
    }

    /// Creates a raw-precision, realtime, deep book subscription for `symbol`.
    #[must_use]
    pub fn book(symbol: &str) -> Self {
        Self {
            event: "subscribe".to_string(),
            channel: Channel::Book.as_str().to_string(),
            symbol: symbol.to_string(),
            prec: Some(BOOK_PRECISION.to_string()),
            freq: Some(BOOK_FREQUENCY.to_string()),
            len: Some(BOOK_LENGTH.to_string()),
        }
    }

    /// Logical name of the channel this request opens.
    pub fn channel_name(&self) -> String {
        channel_name(&self.channel, &self.symbol)
    }
}

/// Server acknowledgement of a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedEvent {
    pub channel: String,
    pub symbol: String,
    #[serde(rename = "chanId")]
    pub chan_id: u64,
}

/// Server-side rejection of a request.
///
/// Every field is optional: errors unrelated to a subscription carry no
/// channel or symbol.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEvent {
    pub channel: Option<String>,
    pub symbol: Option<String>,
    pub code: Option<i64>,
    pub msg: Option<String>,
}

/// A decoded inbound WebSocket frame.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// `{"event":"subscribed", ...}`: a channel id was assigned.
    Subscribed(SubscribedEvent),
    /// `{"event":"info", ...}`: platform status or version information.
    Info,
    /// `{"event":"error", ...}`.
    Error(ErrorEvent),
    /// Any other event (`conf`, `pong`, `unsubscribed`, ...).
    Unknown { event: String },
    /// `[chanId, payload, ...]`: data on a subscribed channel.
    ChannelData { chan_id: u64, payload: Value },
}

impl InboundMessage {
    /// Decodes a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::MalformedMessage`] if the frame is not JSON or
    /// has neither the event-object nor the channel-array shape.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BfxError::MalformedMessage(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decodes an already-parsed JSON frame.
    ///
    /// # Errors
    ///
    /// See [`InboundMessage::parse`].
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => {
                let event = value
                    .get("event")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        BfxError::MalformedMessage("event object without `event` field".into())
                    })?
                    .to_string();

                match event.as_str() {
                    "subscribed" => Ok(InboundMessage::Subscribed(serde_json::from_value(value)?)),
                    "info" => Ok(InboundMessage::Info),
                    "error" => Ok(InboundMessage::Error(serde_json::from_value(value)?)),
                    _ => Ok(InboundMessage::Unknown { event }),
                }
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                let chan_id = items.next().and_then(|v| v.as_u64()).ok_or_else(|| {
                    BfxError::MalformedMessage("channel message without numeric channel id".into())
                })?;
                let payload = items.next().ok_or_else(|| {
                    BfxError::MalformedMessage(format!(
                        "channel message for {chan_id} without payload"
                    ))
                })?;

                Ok(InboundMessage::ChannelData { chan_id, payload })
            }
            other => Err(BfxError::MalformedMessage(format!(
                "unexpected frame: {other}"
            ))),
        }
    }
}
