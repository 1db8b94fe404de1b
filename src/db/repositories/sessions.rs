//! Session persistence: upsert on first event, update as a file is synced.

use rusqlite::{Connection, OptionalExtension};

use crate::error::MemoryNexusError;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub project_path_encoded: String,
    pub project_path_decoded: String,
    pub project_name: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub message_count: i64,
    pub summary: Option<String>,
}

/// Insert a session row if absent; a no-op if the id already exists, since
/// the orchestrator calls this once per event and the row is created by the
/// first one.
pub fn ensure_exists(
    conn: &Connection,
    id: &str,
    project_path_encoded: &str,
    project_path_decoded: &str,
    project_name: &str,
    start_time: &str,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO sessions (id, project_path_encoded, project_path_decoded, project_name, start_time)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO NOTHING",
        rusqlite::params![id, project_path_encoded, project_path_decoded, project_name, start_time],
    )?;
    Ok(())
}

pub fn set_summary(conn: &Connection, id: &str, summary: &str) -> Result<(), MemoryNexusError> {
    conn.execute(
        "UPDATE sessions SET summary = ?1 WHERE id = ?2",
        rusqlite::params![summary, id],
    )?;
    Ok(())
}

pub fn set_end_time(conn: &Connection, id: &str, end_time: &str) -> Result<(), MemoryNexusError> {
    conn.execute(
        "UPDATE sessions SET end_time = ?1 WHERE id = ?2",
        rusqlite::params![end_time, id],
    )?;
    Ok(())
}

/// Recompute and persist `message_count` from the actual row count, called
/// at end-of-file per spec §4.9 step 6.
pub fn refresh_message_count(conn: &Connection, id: &str) -> Result<i64, MemoryNexusError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages_meta WHERE session_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    conn.execute(
        "UPDATE sessions SET message_count = ?1 WHERE id = ?2",
        rusqlite::params![count, id],
    )?;
    Ok(count)
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<Session>, MemoryNexusError> {
    conn.query_row(
        "SELECT id, project_path_encoded, project_path_decoded, project_name, start_time, end_time, message_count, summary
         FROM sessions WHERE id = ?1",
        [id],
        row_to_session,
    )
    .optional()
    .map_err(MemoryNexusError::from)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        project_path_encoded: row.get(1)?,
        project_path_decoded: row.get(2)?,
        project_name: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        message_count: row.get(6)?,
        summary: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Connection as DbConnection;

    #[test]
    fn ensure_exists_is_idempotent() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn refresh_message_count_reflects_inserted_rows() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        conn.execute(
            "INSERT INTO messages_meta (id, session_id, role, content, timestamp) VALUES ('m1','s1','user','hi','2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let count = refresh_message_count(conn, "s1").unwrap();
        assert_eq!(count, 1);
        let session = find(conn, "s1").unwrap().unwrap();
        assert_eq!(session.message_count, 1);
    }

    #[test]
    fn find_missing_session_returns_none() {
        let db = DbConnection::open_in_memory().unwrap();
        assert!(find(db.raw(), "nope").unwrap().is_none());
    }
}
