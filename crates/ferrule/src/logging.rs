//! Service-level logging
//!
//! A [`Logger`] pushes [`LogEntry`] values through its own
//! [`CommunicatorPool`], so slow writers never hold up request handling.
//! [`TracingWriter`] forwards entries to `tracing` inline; [`FileWriter`]
//! appends JSON lines from a worker thread.

use crate::communicators::{CommunicatorId, CommunicatorPool, FastCommunicator, SlowCommunicator};
use chrono::{DateTime, Utc};
use ferrule_core::serde::SerializePipeline;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal operation
    Info,
    /// Something unexpected but handled
    Warn,
    /// A failure
    Error,
}

/// One structured log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Emitting component, e.g. `Purchase v1`
    pub component: String,
    /// Machine-readable event code
    pub code: String,
    /// Event payload
    pub data: Value,
    /// Interaction the entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    /// When the entry was created
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create a new entry stamped now
    pub fn new(level: LogLevel, component: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            level,
            component: component.into(),
            code: code.into(),
            data: Value::Null,
            interaction_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Attach the interaction id
    pub fn with_interaction_id(mut self, interaction_id: impl Into<String>) -> Self {
        self.interaction_id = Some(interaction_id.into());
        self
    }
}

/// Fan-out logger with a minimum level.
pub struct Logger {
    pool: CommunicatorPool<LogEntry>,
    min_level: LogLevel,
}

impl Logger {
    /// Logger with no writers and mailboxes of `capacity`.
    pub fn new(min_level: LogLevel, capacity: usize) -> Self {
        Self {
            pool: CommunicatorPool::with_capacity(capacity),
            min_level,
        }
    }

    /// Logger forwarding to `tracing` only.
    pub fn tracing(min_level: LogLevel, capacity: usize) -> Self {
        let logger = Self::new(min_level, capacity);
        logger.add_fast_writer(TracingWriter);
        logger
    }

    /// Entries below this level are discarded
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Register an inline writer
    pub fn add_fast_writer(&self, writer: impl FastCommunicator<LogEntry> + 'static) -> CommunicatorId {
        self.pool.add_fast(writer)
    }

    /// Register a writer with its own worker thread
    pub fn add_slow_writer(&self, writer: impl SlowCommunicator<LogEntry> + 'static) -> CommunicatorId {
        self.pool.add_slow(writer)
    }

    /// Remove a writer
    pub fn remove_writer(&self, id: CommunicatorId) -> bool {
        self.pool.remove(id)
    }

    /// Send `entry` to every writer if it meets the minimum level.
    pub fn log(&self, entry: LogEntry) {
        if entry.level >= self.min_level {
            self.pool.communicate(entry);
        }
    }

    /// Log at debug level
    pub fn debug(&self, component: &str, code: &str, data: Value) {
        self.log(LogEntry::new(LogLevel::Debug, component, code).with_data(data));
    }

    /// Log at info level
    pub fn info(&self, component: &str, code: &str, data: Value) {
        self.log(LogEntry::new(LogLevel::Info, component, code).with_data(data));
    }

    /// Log at warn level
    pub fn warn(&self, component: &str, code: &str, data: Value) {
        self.log(LogEntry::new(LogLevel::Warn, component, code).with_data(data));
    }

    /// Log at error level
    pub fn error(&self, component: &str, code: &str, data: Value) {
        self.log(LogEntry::new(LogLevel::Error, component, code).with_data(data));
    }

    /// Wait for slow writers to drain.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.pool.wait(timeout)
    }

    /// Drain and stop slow writers.
    pub fn terminate(&self, timeout: Duration) -> bool {
        self.pool.terminate(timeout)
    }
}

/// Re-emits entries as `tracing` events.
pub struct TracingWriter;

impl FastCommunicator<LogEntry> for TracingWriter {
    fn communicate(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let interaction_id = entry.interaction_id.as_deref();
        match entry.level {
            LogLevel::Debug => debug!(component = %entry.component, code = %entry.code, data = %entry.data, interaction_id, "log entry"),
            LogLevel::Info => info!(component = %entry.component, code = %entry.code, data = %entry.data, interaction_id, "log entry"),
            LogLevel::Warn => warn!(component = %entry.component, code = %entry.code, data = %entry.data, interaction_id, "log entry"),
            LogLevel::Error => error!(component = %entry.component, code = %entry.code, data = %entry.data, interaction_id, "log entry"),
        }
        Ok(())
    }
}

/// Code written when a file writer's mailbox overflowed
pub const DROPPED_CODE: &str = "log_entries_dropped";

/// Appends entries to a file as JSON lines.
pub struct FileWriter {
    file: Mutex<File>,
}

impl FileWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_entry(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let line = entry.to_json_line()?;
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl SlowCommunicator<LogEntry> for FileWriter {
    fn communicate(&self, entry: LogEntry) -> anyhow::Result<()> {
        self.write_entry(&entry)
    }

    fn dropped(&self, count: usize) -> anyhow::Result<()> {
        let entry = LogEntry::new(LogLevel::Warn, "logger", DROPPED_CODE)
            .with_data(serde_json::json!({ "count": count }));
        self.write_entry(&entry)
    }
}
