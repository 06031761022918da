//! Incoming WebSocket message processing.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};
use tungstenite::Message;

use crate::Result;
use crate::recorder::{RecordKind, Recorder};
use crate::state::ProtocolState;

/// Feeds every text frame to `state` and records it, taking a snapshot of
/// the state every `snapshot_interval`.
///
/// Frames and snapshots are handled in the same loop, so a snapshot never
/// sees a partially applied update. Returns `Ok` when the server closes the
/// connection.
///
/// # Errors
///
/// Returns a [`BfxError`](crate::BfxError) if reading from the WebSocket
/// fails, a frame violates the protocol (including
/// [`BfxError::Desync`](crate::BfxError::Desync)), or the recording cannot
/// be written. The state must be discarded afterwards.
pub async fn process_messages<R>(
    read: &mut R,
    state: &mut ProtocolState,
    recorder: &mut Recorder,
    snapshot_interval: Duration,
) -> Result<()>
where
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    let mut snapshots = interval_at(Instant::now() + snapshot_interval, snapshot_interval);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let channel = state.handle_text(text.as_str())?;
                        recorder.record(RecordKind::Msg, &channel, text.as_str())?;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {} // Binary/Ping/Pong frames
                    Some(Err(e)) => {
                        warn!("WebSocket error: {e}");
                        return Err(e.into());
                    }
                    None => {
                        warn!("WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = snapshots.tick() => {
                let snapshot = state.snapshot()?;
                recorder.record_snapshot(&snapshot)?;
                debug!(
                    channels = state.channel_count(),
                    records = recorder.records(),
                    "Snapshot taken"
                );
            }
        }
    }

    recorder.flush()
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;
    use crate::BfxError;
    use crate::recorder::Record;

    fn frames(texts: &[&str]) -> Vec<std::result::Result<Message, tungstenite::Error>> {
        texts
            .iter()
            .map(|t| Ok(Message::Text(t.to_string().into())))
            .collect()
    }

    fn read_records(recorder: &Recorder) -> Vec<Record> {
        std::fs::read_to_string(recorder.path())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn records_every_frame_with_its_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let mut state = ProtocolState::new();
        let mut read = stream::iter(frames(&[
            r#"{"event":"info","version":2,"platform":{"status":1}}"#,
            r#"{"event":"subscribed","channel":"book","chanId":11,"symbol":"tBTCUSD"}"#,
            "[11,[[100,1,5],[101,1,-2]]]",
            r#"[11,"hb"]"#,
        ]));

        process_messages(&mut read, &mut state, &mut recorder, Duration::from_secs(3600))
            .await
            .unwrap();

        let channels: Vec<String> = read_records(&recorder)
            .into_iter()
            .map(|r| r.channel)
            .collect();
        assert_eq!(
            channels,
            vec!["info", "book_tBTCUSD", "book_tBTCUSD", "book_tBTCUSD"]
        );
        assert_eq!(state.book(11).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn desync_aborts_processing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let mut state = ProtocolState::new();
        let mut read = stream::iter(frames(&["[99,[100,1,5]]", r#"{"event":"info"}"#]));

        let err = process_messages(&mut read, &mut state, &mut recorder, Duration::from_secs(3600))
            .await
            .unwrap_err();

        assert!(matches!(err, BfxError::Desync { chan_id: 99 }));
        assert_eq!(recorder.records(), 0);
    }

    #[tokio::test]
    async fn close_frame_ends_processing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let mut state = ProtocolState::new();
        let mut items = frames(&[r#"{"event":"info"}"#]);
        items.push(Ok(Message::Close(None)));
        items.extend(frames(&["[1,\"hb\"]"]));
        let mut read = stream::iter(items);

        process_messages(&mut read, &mut state, &mut recorder, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(recorder.records(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_are_recorded_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::create(dir.path()).unwrap();
        let mut state = ProtocolState::new();
        state
            .handle_text(r#"{"event":"subscribed","channel":"book","chanId":11,"symbol":"tBTCUSD"}"#)
            .unwrap();
        state.handle_text("[11,[100,1,5]]").unwrap();

        // a stream that stays open until the snapshot timer has fired
        let mut read = stream::pending::<std::result::Result<Message, tungstenite::Error>>()
            .take_until(Box::pin(tokio::time::sleep(Duration::from_secs(90))));

        process_messages(&mut read, &mut state, &mut recorder, Duration::from_secs(60))
            .await
            .unwrap();

        let records = read_records(&recorder);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == RecordKind::State));
        assert_eq!(records[0].channel, "subscribed");
        assert_eq!(records[1].channel, "book_tBTCUSD");
        assert_eq!(records[1].payload, "[[100.0,1,5.0]]");
    }
}
