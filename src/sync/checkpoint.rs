//! Crash-recovery checkpoint for a multi-file sync run.
//!
//! Written atomically (`tmp` file + `rename`) after each completed session,
//! and deleted on clean completion of the whole sync. Its mere presence on
//! the next invocation means a prior sync was interrupted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MemoryNexusError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    pub started_at: String,
    pub total_sessions: usize,
    pub completed_session_ids: Vec<String>,
    pub last_completed_at: Option<String>,
}

impl SyncCheckpoint {
    pub fn new(started_at: String, total_sessions: usize) -> Self {
        SyncCheckpoint {
            started_at,
            total_sessions,
            completed_session_ids: Vec::new(),
            last_completed_at: None,
        }
    }

    pub fn mark_completed(&mut self, session_id: &str, at: String) {
        if !self.completed_session_ids.iter().any(|id| id == session_id) {
            self.completed_session_ids.push(session_id.to_string());
        }
        self.last_completed_at = Some(at);
    }
}

pub fn load(path: &Path) -> Result<Option<SyncCheckpoint>, MemoryNexusError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write the checkpoint via a `tmp` file + rename, so a crash mid-write
/// never leaves a corrupt checkpoint file.
pub fn save(path: &Path, checkpoint: &SyncCheckpoint) -> Result<(), MemoryNexusError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(checkpoint)?;
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn delete(path: &Path) -> Result<(), MemoryNexusError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
