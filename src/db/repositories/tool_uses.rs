//! Tool-use persistence: created `pending`, transitioned on matching result.

use rusqlite::Connection;

use crate::error::MemoryNexusError;

pub fn insert_pending(
    conn: &Connection,
    id: &str,
    session_id: &str,
    name: &str,
    input: &str,
    timestamp: &str,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO tool_uses (id, session_id, name, input, timestamp, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending')
         ON CONFLICT(id) DO NOTHING",
        rusqlite::params![id, session_id, name, input, timestamp],
    )?;
    Ok(())
}

/// Transition a tool use to `success` or `error` when its matching result
/// arrives. A result with no matching `tool_uses` row (out-of-order or
/// missing tool_use event) is silently ignored — there's nothing to update.
pub fn resolve(
    conn: &Connection,
    tool_use_id: &str,
    is_error: bool,
    result: &str,
) -> Result<(), MemoryNexusError> {
    let status = if is_error { "error" } else { "success" };
    conn.execute(
        "UPDATE tool_uses SET status = ?1, result = ?2 WHERE id = ?3",
        rusqlite::params![status, result, tool_use_id],
    )?;
    Ok(())
}

pub fn status_of(conn: &Connection, id: &str) -> Result<Option<String>, MemoryNexusError> {
    use rusqlite::OptionalExtension;
    Ok(conn
        .query_row("SELECT status FROM tool_uses WHERE id = ?1", [id], |r| r.get(0))
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::sessions;
    use crate::db::Connection as DbConnection;

    #[test]
    fn resolve_transitions_pending_to_success() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        insert_pending(conn, "t1", "s1", "Bash", "{}", "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(status_of(conn, "t1").unwrap().as_deref(), Some("pending"));
        resolve(conn, "t1", false, "ok").unwrap();
        assert_eq!(status_of(conn, "t1").unwrap().as_deref(), Some("success"));
    }

    #[test]
    fn resolve_with_error_flag_marks_error() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        insert_pending(conn, "t1", "s1", "Bash", "{}", "2026-01-01T00:00:00Z").unwrap();
        resolve(conn, "t1", true, "permission denied").unwrap();
        assert_eq!(status_of(conn, "t1").unwrap().as_deref(), Some("error"));
    }

    #[test]
    fn resolve_with_unknown_id_is_a_no_op() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        resolve(conn, "missing", false, "ok").unwrap();
        assert!(status_of(conn, "missing").unwrap().is_none());
    }
}
