//! Entity and link extraction from already-persisted events.
//!
//! The data model supports four entity types (`concept`, `file`, `decision`,
//! `term`) but only `file` has a structural signal strong enough to extract
//! without guessing at semantics: a tool invocation's `input` frequently
//! names the file it operates on. Concept/decision/term extraction would
//! need to interpret message prose, which is explicitly out of scope (no
//! semantic or vector search) — the repository and schema support for those
//! types stays in place for a future pass, but nothing populates them yet.
//!
//! Session-continuation links are the other concrete signal: two sessions in
//! the same project, one starting at or after the other's end, are linked
//! `continues` with weight 1.0.

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::db::repositories::{entities, links};
use crate::error::MemoryNexusError;

/// Tool argument keys, by tool name, that hold a filesystem path. Unlisted
/// tools (Bash, Grep, WebFetch, …) yield no file entity.
fn file_arg_key(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        "Read" | "Write" | "Edit" => Some("file_path"),
        "NotebookEdit" => Some("notebook_path"),
        _ => None,
    }
}

/// Extract and persist a `file` entity for one tool use, linking it to the
/// owning session. A no-op for tools/inputs with no recognizable path.
pub fn extract_file_entity(
    conn: &Connection,
    session_id: &str,
    tool_name: &str,
    input: &Value,
) -> Result<(), MemoryNexusError> {
    let Some(key) = file_arg_key(tool_name) else {
        return Ok(());
    };
    let Some(path) = input.get(key).and_then(Value::as_str) else {
        return Ok(());
    };
    if path.is_empty() {
        return Ok(());
    }
    let metadata = serde_json::json!({ "lastTool": tool_name }).to_string();
    let entity = entities::save(conn, "file", path, &metadata, 1.0)?;
    entities::link_session_entity(conn, session_id, entity.id, 1)?;
    Ok(())
}

/// Link `session_id` to the most recent prior session in the same project
/// whose `end_time` is at or before this session's `start_time` — a weight
/// of 1.0 `continues` link, since this is a structural fact (project +
/// chronological adjacency) rather than an inferred one. A session with no
/// qualifying predecessor is left unlinked.
pub fn link_session_continuation(conn: &Connection, session_id: &str) -> Result<(), MemoryNexusError> {
    let predecessor: Option<String> = conn
        .query_row(
            "SELECT prior.id FROM sessions AS this
             JOIN sessions AS prior
               ON prior.project_name = this.project_name
              AND prior.id != this.id
              AND prior.end_time IS NOT NULL
              AND prior.end_time <= this.start_time
             WHERE this.id = ?1
             ORDER BY prior.end_time DESC
             LIMIT 1",
            [session_id],
            |r| r.get(0),
        )
        .optional()?;

    if let Some(prior_id) = predecessor {
        links::with_weight(conn, "session", &prior_id, "session", session_id, "continues", 1.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::sessions;
    use crate::db::Connection as DbConnection;
    use serde_json::json;

    #[test]
    fn read_tool_creates_file_entity_linked_to_session() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        extract_file_entity(conn, "s1", "Read", &json!({"file_path": "/p/src/main.rs"})).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entities WHERE type = 'file' AND name = '/p/src/main.rs'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn repeated_observations_accumulate_frequency_not_duplicate_rows() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        extract_file_entity(conn, "s1", "Read", &json!({"file_path": "/p/src/main.rs"})).unwrap();
        extract_file_entity(conn, "s1", "Edit", &json!({"file_path": "/p/src/main.rs"})).unwrap();

        let entity_id: i64 = conn
            .query_row("SELECT id FROM entities WHERE type = 'file'", [], |r| r.get(0))
            .unwrap();
        let frequency = entities::frequency_of(conn, "s1", entity_id).unwrap();
        assert_eq!(frequency, 2);
    }

    #[test]
    fn links_to_most_recent_predecessor_in_same_project() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        sessions::set_end_time(conn, "s1", "2026-01-01T01:00:00Z").unwrap();
        sessions::ensure_exists(conn, "s2", "-p", "/p", "p", "2026-01-01T02:00:00Z").unwrap();

        link_session_continuation(conn, "s2").unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let (source, target): (String, String) = conn
            .query_row("SELECT source_id, target_id FROM links", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(source, "s1");
        assert_eq!(target, "s2");
    }

    #[test]
    fn no_predecessor_is_a_no_op() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();

        link_session_continuation(conn, "s1").unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn tools_without_a_path_argument_are_a_no_op() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        extract_file_entity(conn, "s1", "Bash", &json!({"command": "ls"})).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
