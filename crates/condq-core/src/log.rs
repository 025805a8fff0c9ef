//! Structured JSONL diagnostics.
//!
//! Provides:
//! - [`LogEntry`]: one record, serialized as a single JSON line.
//! - [`LogEmitter`]: writes records to stderr, a file, or an in-memory buffer.
//! - [`install`] / [`uninstall`]: the process-wide emitter used by the
//!   primitives. With none installed, enabled records go to stderr.
//! - [`parse_line`]: validates one JSONL line back into a [`LogEntry`].
//!
//! Records below [`config::log_level`](crate::config::log_level) are never
//! built, so a disabled log costs one atomic load per call site.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Canonical structured log record.
///
/// Required fields: `timestamp_ns`, `level`, `component`, `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    pub level: LogLevel,
    pub component: String,
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    /// Time left until the caller's deadline when the record was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_ns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_ns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiters: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn duration_ns(dur: Duration) -> u64 {
    u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX)
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, component: &str, event: &str) -> Self {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_ns)
            .unwrap_or(0);
        Self {
            timestamp_ns,
            level,
            component: component.to_string(),
            event: event.to_string(),
            errno: None,
            remaining_ns: None,
            ceiling_ns: None,
            waiters: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    #[must_use]
    pub fn with_remaining(mut self, remaining: Duration) -> Self {
        self.remaining_ns = Some(duration_ns(remaining));
        self
    }

    #[must_use]
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling_ns = Some(duration_ns(ceiling));
        self
    }

    #[must_use]
    pub fn with_waiters(mut self, waiters: u64) -> Self {
        self.waiters = Some(waiters);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serializes to one JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A JSONL line that is not a valid [`LogEntry`].
#[derive(Debug, thiserror::Error)]
pub enum LogLineError {
    #[error("malformed log line: {0}")]
    Json(#[from] serde_json::Error),
    #[error("log line has an empty `{0}` field")]
    EmptyField(&'static str),
}

/// Validates a single JSONL line.
pub fn parse_line(line: &str) -> Result<LogEntry, LogLineError> {
    let entry: LogEntry = serde_json::from_str(line)?;
    if entry.event.is_empty() {
        return Err(LogLineError::EmptyField("event"));
    }
    if entry.component.is_empty() {
        return Err(LogLineError::EmptyField("component"));
    }
    Ok(entry)
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

enum Target {
    Stderr,
    File(BufWriter<File>),
    Buffer(Vec<String>),
}

/// Destination for JSONL records.
pub struct LogEmitter {
    target: Target,
}

impl LogEmitter {
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            target: Target::Stderr,
        }
    }

    /// Appends to `path`, creating it if needed.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            target: Target::File(BufWriter::new(file)),
        })
    }

    /// Keeps lines in memory; read them back with [`lines`](Self::lines).
    #[must_use]
    pub fn buffer() -> Self {
        Self {
            target: Target::Buffer(Vec::new()),
        }
    }

    pub fn emit(&mut self, entry: &LogEntry) -> io::Result<()> {
        let line = entry.to_json_line().map_err(io::Error::other)?;
        match &mut self.target {
            Target::Stderr => writeln!(io::stderr().lock(), "{line}"),
            Target::File(writer) => writeln!(writer, "{line}"),
            Target::Buffer(lines) => {
                lines.push(line);
                Ok(())
            }
        }
    }

    /// Buffered lines; empty for stderr and file emitters.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        match &self.target {
            Target::Buffer(lines) => lines,
            _ => &[],
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Stderr => io::stderr().flush(),
            Target::File(writer) => writer.flush(),
            Target::Buffer(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.target {
            Target::Stderr => "stderr",
            Target::File(_) => "file",
            Target::Buffer(_) => "buffer",
        };
        f.debug_struct("LogEmitter").field("target", &kind).finish()
    }
}

static INSTALLED: Mutex<Option<LogEmitter>> = parking_lot::const_mutex(None);

/// Routes records to `emitter`, returning the previously installed one.
pub fn install(emitter: LogEmitter) -> Option<LogEmitter> {
    INSTALLED.lock().replace(emitter)
}

/// Removes the installed emitter (flushed) so it can be inspected.
pub fn uninstall() -> Option<LogEmitter> {
    let mut emitter = INSTALLED.lock().take()?;
    let _ = emitter.flush();
    Some(emitter)
}

/// True when records at `level` would be written.
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    config::log_level().is_some_and(|min| level >= min)
}

/// Builds and writes one record if `level` is enabled.
///
/// Write failures are swallowed: diagnostics never fail the operation they
/// describe.
pub(crate) fn record(
    level: LogLevel,
    component: &str,
    event: &str,
    fill: impl FnOnce(LogEntry) -> LogEntry,
) {
    if !enabled(level) {
        return;
    }
    let entry = fill(LogEntry::new(level, component, event));
    let mut installed = INSTALLED.lock();
    let _ = match installed.as_mut() {
        Some(emitter) => emitter.emit(&entry),
        None => LogEmitter::stderr().emit(&entry),
    };
}
