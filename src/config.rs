//! Configuration loading for memory-nexus.
//!
//! # Architecture overview
//!
//! Configuration lives in `~/.memory-nexus/config.json` and is purely
//! optional. When absent, unreadable, or not a JSON object, every option
//! falls back to its documented default — this is the spec's `ConfigInvalid`
//! policy ("warn + fall back to defaults"), never a hard failure. Unlike a
//! user-editable tool config, nothing in the core mutates this file; it is
//! loaded once per process and treated as immutable for the rest of the
//! run (see spec §5, "Configuration is loaded once per process").
//!
//! # TRADE-OFFS
//!
//! - JSON rather than TOML: the spec fixes the file as `config.json`, and the
//!   crate already depends on `serde_json` for event parsing, so no extra
//!   TOML dependency is pulled in for a file nothing here edits in place.
//! - Every field is optional in the wire format (`#[serde(default)]`) so a
//!   config file with a single key is valid, matching the "all enabled,
//!   sensible defaults" posture the spec documents.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::MemoryNexusError;

/// Minimum level written to the persisted sync/hook log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    fn rank(self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warn => 2,
            LogLevel::Error => 3,
        }
    }

    /// Whether a record at `other` should be written given this minimum level.
    pub fn admits(self, other: LogLevel) -> bool {
        other.rank() >= self.rank()
    }
}

/// Top-level config deserialized from `~/.memory-nexus/config.json`.
///
/// All fields fall back to the defaults in spec §6 when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Enables hook-triggered sync.
    pub auto_sync: bool,
    /// First invocation scans for orphaned sessions.
    pub recovery_on_startup: bool,
    /// Honour the `PreCompact` hook event.
    pub sync_on_compaction: bool,
    /// Parent hook wait, in milliseconds (does not bound the detached child).
    pub timeout: u64,
    /// Minimum level written to the persisted log.
    pub log_level: LogLevel,
    /// Rotate log files older than this many days.
    pub log_retention_days: u32,
    /// If true, per-file sync errors surface to stderr.
    pub show_failures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_sync: true,
            recovery_on_startup: true,
            sync_on_compaction: true,
            timeout: 5000,
            log_level: LogLevel::Info,
            log_retention_days: 7,
            show_failures: false,
        }
    }
}

impl Config {
    /// Load config from `~/.memory-nexus/config.json`.
    ///
    /// Returns `Config::default()` when the file is absent, unreadable, or
    /// fails to parse as a JSON object — the spec's `ConfigInvalid` policy is
    /// "warn and fall back to defaults", never a hard failure. The warning
    /// is returned to the caller as `Err` only when the caller explicitly
    /// wants to observe it via [`Config::load_checked`]; [`Config::load`]
    /// swallows it, since most call sites just want a usable config.
    pub fn load() -> Config {
        Self::load_checked().unwrap_or_else(|_| Config::default())
    }

    /// Like [`Config::load`], but returns `Err(ConfigInvalid)` instead of
    /// silently falling back, so callers that want to log the fallback can.
    /// The returned config inside the error case is always `Config::default()`.
    pub fn load_checked() -> Result<Config, MemoryNexusError> {
        let path = match config_path() {
            Ok(p) => p,
            Err(e) => return Err(MemoryNexusError::ConfigInvalid(e.to_string())),
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Ok(Config::default()),
        };
        serde_json::from_str(&content)
            .map_err(|e| MemoryNexusError::ConfigInvalid(e.to_string()))
    }
}

fn config_path() -> Result<PathBuf, MemoryNexusError> {
    let home = dirs::home_dir()
        .ok_or_else(|| MemoryNexusError::Other("cannot determine home directory".into()))?;
    Ok(home.join(".memory-nexus").join("config.json"))
}

/// Base directory for all persisted state (`~/.memory-nexus`).
pub fn state_dir() -> Result<PathBuf, MemoryNexusError> {
    let home = dirs::home_dir()
        .ok_or_else(|| MemoryNexusError::Other("cannot determine home directory".into()))?;
    Ok(home.join(".memory-nexus"))
}

/// Database file path, honoring the `MEMORY_NEXUS_DB` override.
pub fn db_path() -> Result<PathBuf, MemoryNexusError> {
    if let Ok(p) = std::env::var("MEMORY_NEXUS_DB") {
        return Ok(PathBuf::from(p));
    }
    Ok(state_dir()?.join("memory.db"))
}

/// Host session root (`~/host-sessions`), honoring the
/// `MEMORY_NEXUS_SESSION_ROOT` override used by integration tests.
pub fn session_root() -> Result<PathBuf, MemoryNexusError> {
    if let Ok(p) = std::env::var("MEMORY_NEXUS_SESSION_ROOT") {
        return Ok(PathBuf::from(p));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| MemoryNexusError::Other("cannot determine home directory".into()))?;
    Ok(home.join("host-sessions"))
}

/// Persisted JSON-lines sync/hook log file path.
pub fn log_path() -> Result<PathBuf, MemoryNexusError> {
    Ok(state_dir()?.join("logs").join("sync.log"))
}

/// Ephemeral multi-file sync checkpoint path.
pub fn checkpoint_path() -> Result<PathBuf, MemoryNexusError> {
    Ok(state_dir()?.join("sync-checkpoint.json"))
}
