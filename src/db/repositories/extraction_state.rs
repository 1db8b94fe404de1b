//! Per-file extraction progress, keyed by session-file path.

use rusqlite::{Connection, OptionalExtension};

use crate::error::MemoryNexusError;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionState {
    pub id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub messages_extracted: i64,
    pub file_mtime: Option<i64>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<ExtractionState>, MemoryNexusError> {
    conn.query_row(
        "SELECT id, status, started_at, completed_at, messages_extracted, file_mtime, file_size, error_message
         FROM extraction_state WHERE id = ?1",
        [id],
        row_to_state,
    )
    .optional()
    .map_err(MemoryNexusError::from)
}

fn row_to_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExtractionState> {
    Ok(ExtractionState {
        id: row.get(0)?,
        status: row.get(1)?,
        started_at: row.get(2)?,
        completed_at: row.get(3)?,
        messages_extracted: row.get(4)?,
        file_mtime: row.get(5)?,
        file_size: row.get(6)?,
        error_message: row.get(7)?,
    })
}

/// Begin (or restart) tracking a file: `pending` on first sight, reset to
/// `in_progress` on re-entry.
pub fn start(conn: &Connection, id: &str, started_at: &str) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO extraction_state (id, status, started_at) VALUES (?1, 'in_progress', ?2)
         ON CONFLICT(id) DO UPDATE SET status = 'in_progress', started_at = excluded.started_at,
             completed_at = NULL, error_message = NULL",
        rusqlite::params![id, started_at],
    )?;
    Ok(())
}

pub fn complete(
    conn: &Connection,
    id: &str,
    completed_at: &str,
    messages_extracted: i64,
    file_mtime: i64,
    file_size: i64,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "UPDATE extraction_state
         SET status = 'complete', completed_at = ?1, messages_extracted = ?2, file_mtime = ?3, file_size = ?4
         WHERE id = ?5",
        rusqlite::params![completed_at, messages_extracted, file_mtime, file_size, id],
    )?;
    Ok(())
}

pub fn mark_error(conn: &Connection, id: &str, error_message: &str) -> Result<(), MemoryNexusError> {
    conn.execute(
        "UPDATE extraction_state SET status = 'error', error_message = ?1 WHERE id = ?2",
        rusqlite::params![error_message, id],
    )?;
    Ok(())
}

/// Drop a file's extraction state entirely, used by `--force` resync to make
/// `is_unchanged` report false regardless of recorded mtime/size.
pub fn delete(conn: &Connection, id: &str) -> Result<(), MemoryNexusError> {
    conn.execute("DELETE FROM extraction_state WHERE id = ?1", [id])?;
    Ok(())
}

/// Most recent successful completion across every tracked file, used by the
/// `status` command.
pub fn last_completed_at(conn: &Connection) -> Result<Option<String>, MemoryNexusError> {
    Ok(conn.query_row(
        "SELECT MAX(completed_at) FROM extraction_state WHERE status = 'complete'",
        [],
        |r| r.get(0),
    )?)
}

/// Whether a previously-synced file can be skipped: state is `complete` and
/// `(mtime, size)` match what was recorded last time.
pub fn is_unchanged(
    conn: &Connection,
    id: &str,
    file_mtime: i64,
    file_size: i64,
) -> Result<bool, MemoryNexusError> {
    Ok(find(conn, id)?.is_some_and(|s| {
        s.status == "complete" && s.file_mtime == Some(file_mtime) && s.file_size == Some(file_size)
    }))
}
