//! Structured logging: interactive diagnostics plus the persisted sync/hook log.
//!
//! # Architecture overview
//!
//! Two logging surfaces exist side by side, per spec §4.10 and §10.3:
//!
//! - [`init_tracing`] wires up `tracing-subscriber` for human-readable stderr
//!   output during interactive command runs (`sync`, `search`, `stats`,
//!   `status`), filtered by [`crate::config::Config::log_level`].
//! - [`LogWriter`] appends one JSON object per line to
//!   `~/.memory-nexus/logs/sync.log`, with the exact field set the spec
//!   fixes: `timestamp, level, message, sessionId?, durationMs?, error?,
//!   hookEvent?`. This is hand-rolled rather than routed through a generic
//!   tracing layer because the wire format is a hard external contract, not
//!   an internal convenience — the same reasoning the teacher applies to
//!   session-file parsing (explicit field extraction, not a derived schema).
//!
//! Log writes that fail are swallowed: per spec §4.10, "logging never blocks
//! sync."

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::LogLevel;

/// One record in the persisted JSON-lines log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord<'a> {
    pub timestamp: String,
    pub level: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_event: Option<&'a str>,
}

/// Append-only JSON-lines writer with mtime-based rotation.
pub struct LogWriter {
    path: PathBuf,
    min_level: LogLevel,
    retention_days: u32,
}

impl LogWriter {
    pub fn new(path: PathBuf, min_level: LogLevel, retention_days: u32) -> Self {
        LogWriter {
            path,
            min_level,
            retention_days,
        }
    }

    /// The log file this writer appends to, also used as the stdio target
    /// for a hook-spawned detached sync process.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record if its level clears the configured minimum.
    ///
    /// Rotation: if the current log file is older than `retention_days`, it
    /// is renamed to `sync.log.YYYY-MM-DD` (the rename's destination date is
    /// the file's own last-modified date) before the new record is appended.
    /// Any failure here — rotation or write — is silently swallowed.
    pub fn write(&self, level: LogLevel, record: &LogRecord<'_>) {
        if !self.min_level.admits(level) {
            return;
        }
        let _ = self.rotate_if_stale();
        let _ = self.append(record);
    }

    fn rotate_if_stale(&self) -> std::io::Result<()> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(_) => return Ok(()), // no file yet, nothing to rotate
        };
        let modified = meta.modified()?;
        let age = std::time::SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        let retention = std::time::Duration::from_secs(self.retention_days as u64 * 86_400);
        if age <= retention {
            return Ok(());
        }
        let date: chrono::DateTime<chrono::Utc> = modified.into();
        let rotated = rotated_path(&self.path, &date.format("%Y-%m-%d").to_string());
        std::fs::rename(&self.path, rotated)
    }

    fn append(&self, record: &LogRecord<'_>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut line = serde_json::to_vec(record).unwrap_or_default();
        line.push(b'\n');
        file.write_all(&line)
    }
}

fn rotated_path(path: &Path, date: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "sync.log".to_string());
    name.push('.');
    name.push_str(date);
    path.with_file_name(name)
}

/// Build a [`LogRecord`] with the current time.
pub fn now_record<'a>(level: LogLevel, message: impl Into<String>) -> LogRecordBuilder<'a> {
    LogRecordBuilder {
        level,
        message: message.into(),
        session_id: None,
        duration_ms: None,
        error: None,
        hook_event: None,
    }
}

pub struct LogRecordBuilder<'a> {
    level: LogLevel,
    message: String,
    session_id: Option<&'a str>,
    duration_ms: Option<u64>,
    error: Option<&'a str>,
    hook_event: Option<&'a str>,
}

impl<'a> LogRecordBuilder<'a> {
    pub fn session_id(mut self, id: &'a str) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn error(mut self, err: &'a str) -> Self {
        self.error = Some(err);
        self
    }

    pub fn hook_event(mut self, event: &'a str) -> Self {
        self.hook_event = Some(event);
        self
    }

    pub fn build(self) -> (LogLevel, LogRecord<'a>) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        (
            self.level,
            LogRecord {
                timestamp,
                level: self.level.as_str(),
                message: self.message,
                session_id: self.session_id,
                duration_ms: self.duration_ms,
                error: self.error,
                hook_event: self.hook_event,
            },
        )
    }
}

/// Initialize the interactive `tracing` subscriber for stderr diagnostics.
///
/// Idempotent: a second call is a no-op (matches `tracing`'s own guidance —
/// `set_global_default` errors if called twice, which we ignore here since
/// tests may initialize it more than once across threads).
pub fn init_tracing(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_new(level.as_str())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_appends_json_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");
        let writer = LogWriter::new(path.clone(), LogLevel::Info, 7);
        let (level, record) = now_record(LogLevel::Info, "hello").session_id("abc").build();
        writer.write(level, &record);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["message"], "hello");
        assert_eq!(parsed["sessionId"], "abc");
        assert_eq!(parsed["level"], "info");
    }

    #[test]
    fn write_below_min_level_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");
        let writer = LogWriter::new(path.clone(), LogLevel::Warn, 7);
        let (level, record) = now_record(LogLevel::Debug, "should not appear").build();
        writer.write(level, &record);
        assert!(!path.exists());
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let (_, record) = now_record(LogLevel::Info, "plain").build();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("sessionId"));
        assert!(!json.contains("durationMs"));
    }

    #[test]
    fn rotated_path_appends_date_suffix() {
        let p = rotated_path(Path::new("/tmp/sync.log"), "2026-01-01");
        assert_eq!(p, PathBuf::from("/tmp/sync.log.2026-01-01"));
    }
}
