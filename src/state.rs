//! Per-connection protocol state.
//!
//! [`ProtocolState`] maps the channel ids Bitfinex assigns in `subscribed`
//! acknowledgements to logical channel names, classifies every inbound
//! frame by the channel it belongs to, and keeps one [`OrderBook`] per book
//! channel. Channel ids are only meaningful for the connection that
//! received them: build a new state for every connection.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::book::BookPayload;
use crate::models::{
    CHANNEL_INFO, CHANNEL_SUBSCRIBED, CHANNEL_UNKNOWN, Channel, ErrorEvent, InboundMessage,
    SubscribeRequest, channel_name,
};
use crate::orderbook::OrderBook;
use crate::{BfxError, Result};

/// Channel-id resolution and order books for one connection.
#[derive(Debug, Default)]
pub struct ProtocolState {
    channels: HashMap<u64, String>,
    books: BTreeMap<u64, OrderBook>,
}

impl ProtocolState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a text frame and applies it.
    ///
    /// Returns the name of the channel the frame belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::MalformedMessage`] for frames that violate the
    /// protocol and [`BfxError::Desync`] for data on an unknown channel id.
    /// Either one invalidates this state.
    pub fn handle_text(&mut self, text: &str) -> Result<String> {
        self.handle(InboundMessage::parse(text)?)
    }

    /// Applies a decoded frame and returns the name of its channel.
    ///
    /// # Errors
    ///
    /// See [`ProtocolState::handle_text`].
    pub fn handle(&mut self, message: InboundMessage) -> Result<String> {
        match message {
            InboundMessage::Subscribed(event) => {
                let channel = channel_name(&event.channel, &event.symbol);
                info!(chan_id = event.chan_id, channel, "Channel subscribed");
                self.channels.insert(event.chan_id, channel.clone());
                Ok(channel)
            }
            InboundMessage::Info => Ok(CHANNEL_INFO.to_string()),
            InboundMessage::Error(event) => Ok(error_channel(&event)),
            InboundMessage::Unknown { event } => {
                debug!(event, "Unhandled event");
                Ok(CHANNEL_UNKNOWN.to_string())
            }
            InboundMessage::ChannelData { chan_id, payload } => {
                self.handle_channel_data(chan_id, payload)
            }
        }
    }

    /// Returns the channel name an outbound subscribe request refers to.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Json`] if `message` is not a subscribe request.
    pub fn outbound_channel(&self, message: &str) -> Result<String> {
        let request: SubscribeRequest = serde_json::from_str(message)?;
        Ok(request.channel_name())
    }

    /// Resolves a server-assigned channel id.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Desync`] if no `subscribed` event announced it.
    pub fn resolve(&self, chan_id: u64) -> Result<&str> {
        self.channels
            .get(&chan_id)
            .map(String::as_str)
            .ok_or(BfxError::Desync { chan_id })
    }

    /// The order book of a book channel, once it received data.
    pub fn book(&self, chan_id: u64) -> Option<&OrderBook> {
        self.books.get(&chan_id)
    }

    /// Number of channels acknowledged so far.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Serializes every tracked channel.
    ///
    /// The first entry, under [`CHANNEL_SUBSCRIBED`], maps channel names to
    /// their ids. It is followed by one entry per order book, keyed by its
    /// channel name, holding `[price, count, amount]` rows in ascending
    /// price order.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Json`] if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<(String, String)>> {
        let names: HashMap<&str, u64> = self
            .channels
            .iter()
            .map(|(chan_id, name)| (name.as_str(), *chan_id))
            .collect();

        let mut states = Vec::with_capacity(self.books.len() + 1);
        states.push((CHANNEL_SUBSCRIBED.to_string(), serde_json::to_string(&names)?));

        for (chan_id, book) in &self.books {
            let channel = self.resolve(*chan_id)?;
            states.push((
                channel.to_string(),
                serde_json::to_string(&book.snapshot_levels())?,
            ));
        }

        Ok(states)
    }

    fn handle_channel_data(&mut self, chan_id: u64, payload: Value) -> Result<String> {
        let channel = self.resolve(chan_id)?.to_string();

        if !channel.starts_with(Channel::Book.as_str()) {
            return Ok(channel);
        }

        match BookPayload::from_value(payload)? {
            BookPayload::Heartbeat => {}
            BookPayload::Marker(marker) => {
                debug!(channel, marker, "Ignoring book marker");
            }
            BookPayload::Entries(entries) => {
                // books exist only once data arrived; an empty first
                // update still registers the channel for snapshots
                self.books.entry(chan_id).or_default().apply_all(&entries);
            }
        }

        Ok(channel)
    }
}

/// Best-effort channel name of an error event.
fn error_channel(event: &ErrorEvent) -> String {
    let channel = event.channel.as_deref().unwrap_or_default();
    let symbol = event.symbol.as_deref().unwrap_or_default();
    warn!(
        code = ?event.code,
        msg = ?event.msg,
        channel,
        symbol,
        "Error event"
    );
    channel_name(channel, symbol)
}
