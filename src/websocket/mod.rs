//! Async WebSocket client for the Bitfinex WebSocket v2 API.
//!
//! This module is organized by domain:
//! - [`subscription`] - Sending the subscription sequence
//! - [`handler`] - Incoming message processing and periodic snapshots
//! - [`connection`] - Reconnection with a fresh protocol state

mod connection;
mod handler;
mod subscription;

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use tungstenite::Message;

use crate::Result;

pub use connection::ConnectionManager;
pub use handler::process_messages;
pub use subscription::send_subscriptions;

/// Write half of a Bitfinex WebSocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a Bitfinex WebSocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`BfxError`](crate::BfxError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}
