//! Channel subscription.

use futures_util::{Sink, SinkExt};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::recorder::{RecordKind, Recorder};
use crate::state::ProtocolState;

/// Sends every subscription message, in order, and records each one under
/// the channel it opens.
///
/// # Errors
///
/// Returns a [`BfxError`](crate::BfxError) if a message is not a subscribe
/// request, sending fails, or the recording cannot be written.
pub async fn send_subscriptions<W>(
    write: &mut W,
    state: &ProtocolState,
    recorder: &mut Recorder,
    messages: &[String],
) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    for message in messages {
        let channel = state.outbound_channel(message)?;
        debug!("Sending subscribe request: {}", message);
        write.send(Message::Text(message.clone().into())).await?;
        recorder.record(RecordKind::Send, &channel, message)?;
        info!(channel, "Subscribed to channel");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use futures_util::sink;

    use super::*;
    use crate::models::SubscribeRequest;

    #[tokio::test]
    async fn sends_and_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let state = ProtocolState::new();
        let messages = vec![
            serde_json::to_string(&SubscribeRequest::trades("tBTCUSD")).unwrap(),
            serde_json::to_string(&SubscribeRequest::book("tBTCUSD")).unwrap(),
        ];

        let sent: Arc<Mutex<Vec<Message>>> = Arc::default();
        let collected = Arc::clone(&sent);
        let mut write = Box::pin(sink::unfold((), move |(), message: Message| {
            let collected = Arc::clone(&collected);
            async move {
                collected.lock().unwrap().push(message);
                Ok::<_, tungstenite::Error>(())
            }
        }));

        send_subscriptions(&mut write, &state, &mut recorder, &messages)
            .await
            .unwrap();

        let texts: Vec<String> = sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.to_text().unwrap().to_string())
            .collect();
        assert_eq!(texts, messages);
        assert_eq!(recorder.records(), 2);
    }

    #[tokio::test]
    async fn rejects_non_subscribe_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let state = ProtocolState::new();
        let mut write = sink::drain::<Message>()
            .sink_map_err(|never: Infallible| -> tungstenite::Error { match never {} });

        let result = send_subscriptions(
            &mut write,
            &state,
            &mut recorder,
            &[r#"{"event":"ping"}"#.to_string()],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(recorder.records(), 0);
    }
}
