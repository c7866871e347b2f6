//! Append-only audit file.
//!
//! One line per event: `<RFC3339 timestamp> - <message>`.  Each record is
//! also mirrored to the process log.  Write failures are logged and
//! dropped; the engine never waits on a broken disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{Local, SecondsFormat};
use log::error;

use super::log_sink::LogAuditSink;
use crate::app::events::AuditEvent;
use crate::app::ports::AuditSink;

pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
    mirror: LogAuditSink,
}

impl FileAuditLog {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            mirror: LogAuditSink::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(event: &AuditEvent) -> String {
        format!(
            "{} - {}\n",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            event
        )
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, event: &AuditEvent) {
        self.mirror.record(event);

        let line = Self::format_line(event);
        // Single write_all per line keeps concurrent records whole.
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            error!("Audit write to {} failed: {}", self.path.display(), e);
        }
    }
}

/// Lines returned by [`tail`] when the caller does not say.
pub const DEFAULT_TAIL_LINES: usize = 200;

/// The last `count` lines of the audit file at `path`, oldest first.
pub fn tail(path: impl AsRef<Path>, count: usize) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    Ok(lines[start..].iter().map(|l| (*l).to_owned()).collect())
}
