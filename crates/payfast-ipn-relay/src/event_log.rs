//! Append-only line log of received notifications and their outcomes.
//!
//! Each line is `[<ISO-8601 UTC, millisecond precision>] <message>`. The file
//! is opened once in append mode; writes are serialised through a mutex so
//! lines from concurrent workers never interleave.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};

pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Failures are reported through tracing and otherwise ignored.
    ///
    /// This blocks on the file; async callers go through `AppState::log_event`.
    pub fn record(&self, message: &str) {
        let line = format_line(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true), message);
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "event log write failed");
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("path", &self.path).finish()
    }
}

/// Newlines inside `message` are escaped so one event stays one line.
fn format_line(timestamp: &str, message: &str) -> String {
    let message = message.replace('\r', "\\r").replace('\n', "\\n");
    format!("[{timestamp}] {message}\n")
}
