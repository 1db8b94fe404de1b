//! Message persistence. The FTS mirror is maintained entirely by triggers
//! (see `db::migrations`), so this repository writes only `messages_meta`.

use rusqlite::Connection;

use crate::error::MemoryNexusError;

pub fn insert(
    conn: &Connection,
    id: &str,
    session_id: &str,
    role: &str,
    content: &str,
    timestamp: &str,
    tool_use_ids: Option<&str>,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO messages_meta (id, session_id, role, content, timestamp, tool_use_ids)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO NOTHING",
        rusqlite::params![id, session_id, role, content, timestamp, tool_use_ids],
    )?;
    Ok(())
}

pub fn count_for_session(conn: &Connection, session_id: &str) -> Result<i64, MemoryNexusError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM messages_meta WHERE session_id = ?1",
        [session_id],
        |r| r.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::sessions;
    use crate::db::Connection as DbConnection;

    #[test]
    fn insert_is_idempotent_by_id() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        insert(conn, "m1", "s1", "user", "hello", "2026-01-01T00:00:00Z", None).unwrap();
        insert(conn, "m1", "s1", "user", "hello", "2026-01-01T00:00:00Z", None).unwrap();
        assert_eq!(count_for_session(conn, "s1").unwrap(), 1);
    }

    #[test]
    fn insert_populates_fts_via_trigger() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        insert(conn, "m1", "s1", "assistant", "streaming parser details", "2026-01-01T00:00:00Z", None).unwrap();
        let matched: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages_fts WHERE messages_fts MATCH 'streaming'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(matched, 1);
    }
}
