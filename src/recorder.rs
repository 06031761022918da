//! Line-delimited JSON recording of a connection.
//!
//! Every connection writes one file,
//! `<dump_dir>/bitfinex_<unix seconds>.jsonl`, holding one [`Record`] per
//! line: raw inbound frames (`msg`), outbound requests (`send`) and state
//! snapshot entries (`state`), each tagged with its channel name.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;

/// Exchange tag used in recording file names.
const EXCHANGE: &str = "bitfinex";

/// What a recorded line holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A frame received from the server.
    Msg,
    /// A frame sent to the server.
    Send,
    /// One entry of a state snapshot.
    State,
}

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub kind: RecordKind,
    pub channel: String,
    /// The frame or snapshot payload as text.
    pub payload: String,
}

/// Appends records to a connection's recording file.
pub struct Recorder {
    path: PathBuf,
    out: BufWriter<File>,
    records: u64,
}

impl Recorder {
    /// Creates the dump directory if needed and opens a new recording file.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Io`](crate::BfxError::Io) if the directory or
    /// the file cannot be created.
    pub fn create(dump_dir: &Path) -> Result<Self> {
        fs::create_dir_all(dump_dir)?;
        let path = dump_dir.join(format!("{EXCHANGE}_{}.jsonl", now_ms() / 1000));
        let file = File::options().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "Recording to file");

        Ok(Self {
            path,
            out: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Io`](crate::BfxError::Io) or
    /// [`BfxError::Json`](crate::BfxError::Json) if the line cannot be
    /// written.
    pub fn record(&mut self, kind: RecordKind, channel: &str, payload: &str) -> Result<()> {
        let record = Record {
            ts: now_ms(),
            kind,
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.records += 1;

        Ok(())
    }

    /// Writes every entry of a state snapshot and flushes the file.
    ///
    /// # Errors
    ///
    /// See [`Recorder::record`].
    pub fn record_snapshot(&mut self, snapshot: &[(String, String)]) -> Result<()> {
        for (channel, payload) in snapshot {
            self.record(RecordKind::State, channel, payload)?;
        }
        self.flush()?;
        debug!(entries = snapshot.len(), "Recorded snapshot");

        Ok(())
    }

    /// Flushes buffered records to disk.
    ///
    /// # Errors
    ///
    /// Returns [`BfxError::Io`](crate::BfxError::Io) if the write fails.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
