//! Error taxonomy for memory-nexus.
//!
//! # Architecture overview
//!
//! Every fallible operation in the crate returns `Result<T, MemoryNexusError>`.
//! Variants map directly onto the error table of the spec: each one carries a
//! documented recovery policy (recovered locally vs. surfaced to the caller)
//! and an exit code for the CLI shell. The hook runner is the one caller that
//! never surfaces an error — it logs and maps everything to exit 0 instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MemoryNexusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("malformed line {line} in {path}: {reason}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid event at line {line} in {path}: {reason}")]
    InvalidEvent {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("cannot read session file {0}: {1}")]
    FileUnreadable(PathBuf, String),

    #[error("FTS5 is not available in this SQLite build")]
    FtsUnavailable,

    #[error("database is locked")]
    DbLocked,

    #[error("database is corrupt: {0}")]
    DbCorrupt(String),

    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("malformed search query: {0}")]
    MalformedQuery(String),

    #[error("config file invalid, falling back to defaults: {0}")]
    ConfigInvalid(String),

    #[error("internal hook error: {0}")]
    HookInternal(String),

    #[error("invalid export file: {0}")]
    ExportInvalid(String),

    #[error("path is invalid: {0}")]
    InvalidPath(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MemoryNexusError>;

impl MemoryNexusError {
    /// Map an error to the process exit code described in spec §6.
    ///
    /// 0 success; 1 validation error; 2 not found; 3 I/O; 4 database;
    /// 5 parse; 6 sync failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            MemoryNexusError::EmptyQuery | MemoryNexusError::MalformedQuery(_) => 1,
            MemoryNexusError::FileNotFound(_) => 2,
            MemoryNexusError::Io(_) | MemoryNexusError::FileUnreadable(_, _) => 3,
            MemoryNexusError::Db(_)
            | MemoryNexusError::DbLocked
            | MemoryNexusError::DbCorrupt(_)
            | MemoryNexusError::FtsUnavailable => 4,
            MemoryNexusError::Json(_) | MemoryNexusError::MalformedLine { .. } => 5,
            MemoryNexusError::InvalidEvent { .. } | MemoryNexusError::ExportInvalid(_) => 6,
            MemoryNexusError::InvalidPath(_)
            | MemoryNexusError::ConfigInvalid(_)
            | MemoryNexusError::HookInternal(_)
            | MemoryNexusError::Other(_) => 1,
        }
    }
}
