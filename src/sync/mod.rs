//! Drives one or many session files end to end: discovery, classification,
//! per-file transactional persistence, and crash-recovery bookkeeping.

pub mod checkpoint;
pub mod discover;

use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::db::repositories::{extraction_state, messages, sessions, tool_uses};
use crate::db::Connection as DbConnection;
use crate::error::MemoryNexusError;
use crate::event::{self, ClassifiedEvent};
use crate::extraction;
use crate::project_path;
use crate::stream_parser::StreamingParser;
use crate::timestamp;
use serde_json::json;
use tracing::{info, warn};

/// Outcome of syncing a single session file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// `ExtractionState` was already `complete` with a matching `(mtime, size)`.
    Skipped,
    Synced { messages: i64, warnings: i64 },
    Failed { error: String },
}

/// Aggregate result of a multi-file sync, per spec §4.9 step 7.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub succeeded: i64,
    pub failed: i64,
    pub warnings: i64,
}

/// Sync one session file end to end.
///
/// `session_id` and `project_dir` are supplied by the caller (derived from
/// the file's path, see [`discover`]) since they come from filesystem
/// placement, not file content.
pub fn sync_file(
    db: &mut DbConnection,
    path: &Path,
    session_id: &str,
    project_dir_encoded: &str,
    now: &str,
) -> Result<FileOutcome, MemoryNexusError> {
    let state_id = path.to_string_lossy().to_string();

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return Ok(FileOutcome::Failed { error: e.to_string() }),
    };
    let file_size = meta.len() as i64;
    let file_mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    if extraction_state::is_unchanged(db.raw(), &state_id, file_mtime, file_size)? {
        return Ok(FileOutcome::Skipped);
    }

    extraction_state::start(db.raw(), &state_id, now)?;

    let project_decoded = project_path::decode_best_effort(project_dir_encoded)?;
    let project_name = project_path::project_name(&project_decoded);

    let result = sync_file_inner(
        db,
        path,
        session_id,
        project_dir_encoded,
        &project_decoded,
        &project_name,
    );

    match result {
        Ok((message_count, warnings)) => {
            extraction_state::complete(db.raw(), &state_id, now, message_count, file_mtime, file_size)?;
            sessions::refresh_message_count(db.raw(), session_id)?;
            extraction::link_session_continuation(db.raw(), session_id)?;
            info!(session_id, messages = message_count, warnings, "session synced");
            Ok(FileOutcome::Synced { messages: message_count, warnings })
        }
        Err(e) => {
            extraction_state::mark_error(db.raw(), &state_id, &e.to_string())?;
            warn!(session_id, error = %e, "session sync failed");
            Ok(FileOutcome::Failed { error: e.to_string() })
        }
    }
}

/// Drive a full sync run over every session file under `session_root`,
/// resuming from `checkpoint_path` if one is present (a prior run was
/// interrupted) and saving progress after each file so a crash mid-run can
/// resume without re-doing completed sessions.
///
/// Returns the aggregate `{succeeded, failed, warnings}` per spec §4.9 step 7;
/// individual file failures never abort the run.
pub fn sync_all(
    db: &mut DbConnection,
    session_root: &Path,
    checkpoint_path: &Path,
    now: &str,
) -> Result<SyncSummary, MemoryNexusError> {
    let files = discover::session_files(session_root);
    let mut checkpoint = match checkpoint::load(checkpoint_path)? {
        Some(existing) => existing,
        None => checkpoint::SyncCheckpoint::new(now.to_string(), files.len()),
    };

    let mut summary = SyncSummary::default();

    for file in &files {
        let session_id = discover::session_id_from_path(file);
        if checkpoint.completed_session_ids.iter().any(|id| id == &session_id) {
            continue;
        }

        let project_encoded = discover::project_dir_name(session_root, file).unwrap_or_default();

        match sync_file(db, file, &session_id, &project_encoded, now) {
            Ok(FileOutcome::Synced { warnings, .. }) => {
                summary.succeeded += 1;
                summary.warnings += warnings;
            }
            Ok(FileOutcome::Skipped) => {
                summary.succeeded += 1;
            }
            Ok(FileOutcome::Failed { .. }) => {
                summary.failed += 1;
            }
            Err(_) => {
                summary.failed += 1;
            }
        }

        checkpoint.mark_completed(&session_id, now.to_string());
        checkpoint::save(checkpoint_path, &checkpoint)?;
    }

    checkpoint::delete(checkpoint_path)?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        warnings = summary.warnings,
        "sync run complete"
    );
    Ok(summary)
}

/// Startup recovery scan (spec §4.9, "enabled in config"): every session
/// file whose `ExtractionState` is absent or `error` is a candidate for
/// re-sync, regardless of what the checkpoint says.
pub fn recoverable_files(db: &DbConnection, session_root: &Path) -> Result<Vec<std::path::PathBuf>, MemoryNexusError> {
    use crate::db::repositories::extraction_state;

    let mut out = Vec::new();
    for file in discover::session_files(session_root) {
        let state_id = file.to_string_lossy().to_string();
        let needs_sync = match extraction_state::find(db.raw(), &state_id)? {
            None => true,
            Some(state) => state.status == "error",
        };
        if needs_sync {
            out.push(file);
        }
    }
    Ok(out)
}

fn sync_file_inner(
    db: &mut DbConnection,
    path: &Path,
    session_id: &str,
    project_encoded: &str,
    project_decoded: &str,
    project_name: &str,
) -> Result<(i64, i64), MemoryNexusError> {
    let events: Vec<ClassifiedEvent> = StreamingParser::open(path)?.collect();

    let conn = db.raw_mut();
    let tx = conn.transaction()?;

    let mut message_count: i64 = 0;
    let mut warnings: i64 = 0;
    let mut session_started = false;

    for classified in &events {
        match classified {
            ClassifiedEvent::User { uuid, content, timestamp: ts, .. } => {
                let normalized = timestamp::normalize(ts);
                if !session_started {
                    sessions::ensure_exists(&tx, session_id, project_encoded, project_decoded, project_name, &normalized)?;
                    session_started = true;
                }
                messages::insert(&tx, uuid, session_id, "user", content, &normalized, None)?;
                message_count += 1;
            }
            ClassifiedEvent::Assistant { uuid, content_blocks, timestamp: ts, .. } => {
                let normalized = timestamp::normalize(ts);
                if !session_started {
                    sessions::ensure_exists(&tx, session_id, project_encoded, project_decoded, project_name, &normalized)?;
                    session_started = true;
                }
                let text: String = content_blocks
                    .iter()
                    .filter_map(|b| match b {
                        event::ContentBlock::Text(t) => Some(t.clone()),
                        event::ContentBlock::ToolUse { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let tool_use_ids: Vec<&str> = content_blocks
                    .iter()
                    .filter_map(|b| match b {
                        event::ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                        event::ContentBlock::Text(_) => None,
                    })
                    .collect();
                let tool_use_ids_json = if tool_use_ids.is_empty() {
                    None
                } else {
                    Some(json!(tool_use_ids).to_string())
                };
                messages::insert(&tx, uuid, session_id, "assistant", &text, &normalized, tool_use_ids_json.as_deref())?;
                message_count += 1;
            }
            ClassifiedEvent::ToolUse { id, name, input, timestamp: ts } => {
                let normalized = timestamp::normalize(ts);
                tool_uses::insert_pending(&tx, id, session_id, name, &input.to_string(), &normalized)?;
                extraction::extract_file_entity(&tx, session_id, name, input)?;
            }
            ClassifiedEvent::ToolResult { tool_use_id, content, is_error, .. } => {
                tool_uses::resolve(&tx, tool_use_id, *is_error, content)?;
            }
            ClassifiedEvent::Summary { content, .. } => {
                if session_started {
                    sessions::set_summary(&tx, session_id, content)?;
                }
            }
            ClassifiedEvent::System { subtype, timestamp: ts, .. } => {
                if session_started && subtype.contains("end") {
                    sessions::set_end_time(&tx, session_id, &timestamp::normalize(ts))?;
                }
            }
            ClassifiedEvent::Skipped { .. } => {
                warnings += 1;
            }
        }
    }

    tx.commit()?;
    Ok((message_count, warnings))
}
