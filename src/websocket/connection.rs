//! WebSocket connection lifecycle management.
//!
//! [`ConnectionManager`] selects the symbols to record, connects, sends the
//! subscriptions and processes messages until the connection ends. Every
//! attempt starts from a fresh [`ProtocolState`] and a new recording file:
//! channel ids from a previous connection are never reused. Failed
//! attempts are retried with exponential backoff.

use std::time::Duration;

use tracing::{error, info, warn};

use super::{connect, process_messages, send_subscriptions};
use crate::config::AppConfig;
use crate::recorder::Recorder;
use crate::selector::{fetch_tickers, subscription_messages};
use crate::state::ProtocolState;
use crate::{BfxError, Result};

/// Initial backoff duration between reconnection attempts.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff duration between reconnection attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Returns the delay to use after `current`.
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Records the Bitfinex feed, reconnecting whenever a connection ends.
pub struct ConnectionManager {
    config: AppConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Runs the connection manager loop indefinitely.
    ///
    /// A desync or any other failure ends the current connection; the next
    /// attempt re-selects symbols and subscribes again from scratch.
    pub async fn run(self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.session(&mut backoff).await {
                Ok(()) => info!("Connection ended"),
                Err(e @ BfxError::Desync { .. }) => {
                    warn!("{e}, reconnecting with fresh state");
                }
                Err(e) => error!("Connection failed: {e}"),
            }

            info!(backoff_secs = backoff.as_secs(), "Backing off before retry");
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    /// Runs one connection from symbol selection to disconnect.
    ///
    /// `backoff` is reset once the subscriptions went out, so only
    /// consecutive failures grow the delay.
    async fn session(&self, backoff: &mut Duration) -> Result<()> {
        let bitfinex = &self.config.bitfinex;

        let tickers = fetch_tickers(&bitfinex.rest_url, bitfinex.ticker_timeout).await?;
        let messages = subscription_messages(&tickers, bitfinex.channel_limit)?;

        info!(url = %bitfinex.websocket_url, "Connecting to WebSocket");
        let (mut write, mut read) = connect(&bitfinex.websocket_url).await?;

        let mut state = ProtocolState::new();
        let mut recorder = Recorder::create(&self.config.recorder.dump_dir)?;

        send_subscriptions(&mut write, &state, &mut recorder, &messages).await?;
        info!(
            channels = messages.len(),
            "WebSocket connected and subscribed"
        );
        *backoff = INITIAL_BACKOFF;

        process_messages(
            &mut read,
            &mut state,
            &mut recorder,
            self.config.recorder.snapshot_interval,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_max() {
        let mut backoff = INITIAL_BACKOFF;
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(backoff.as_secs());
            backoff = next_backoff(backoff);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }
}
