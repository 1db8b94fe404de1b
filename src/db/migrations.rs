//! Schema DDL, versioned via `PRAGMA user_version`.
//!
//! One entry in `MIGRATIONS` per schema version; `run_migrations` applies
//! whichever are newer than the database's current `user_version`, so
//! re-running against an up-to-date database is a no-op.

use rusqlite::Connection;

use crate::error::MemoryNexusError;

pub const SCHEMA_VERSION: i32 = 1;

const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE IF NOT EXISTS sessions (
    id                    TEXT PRIMARY KEY,
    project_path_encoded  TEXT NOT NULL,
    project_path_decoded  TEXT NOT NULL,
    project_name          TEXT NOT NULL,
    start_time            TEXT NOT NULL,
    end_time              TEXT,
    message_count         INTEGER NOT NULL DEFAULT 0,
    summary               TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_project_encoded ON sessions(project_path_encoded);

CREATE TABLE IF NOT EXISTS messages_meta (
    rowid         INTEGER PRIMARY KEY AUTOINCREMENT,
    id            TEXT NOT NULL UNIQUE,
    session_id    TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role          TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
    content       TEXT NOT NULL,
    timestamp     TEXT NOT NULL,
    tool_use_ids  TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON messages_meta(session_id);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages_meta(timestamp);

CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    content,
    content='',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS messages_meta_ai AFTER INSERT ON messages_meta BEGIN
    INSERT INTO messages_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TRIGGER IF NOT EXISTS messages_meta_ad AFTER DELETE ON messages_meta BEGIN
    INSERT INTO messages_fts(messages_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
END;

CREATE TRIGGER IF NOT EXISTS messages_meta_au AFTER UPDATE ON messages_meta BEGIN
    INSERT INTO messages_fts(messages_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
    INSERT INTO messages_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TABLE IF NOT EXISTS tool_uses (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    input       TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'success', 'error')),
    result      TEXT
);

CREATE INDEX IF NOT EXISTS idx_tool_uses_session ON tool_uses(session_id);

CREATE TABLE IF NOT EXISTS links (
    source_type   TEXT NOT NULL,
    source_id     TEXT NOT NULL,
    target_type   TEXT NOT NULL,
    target_id     TEXT NOT NULL,
    relationship  TEXT NOT NULL,
    weight        REAL NOT NULL CHECK (weight BETWEEN 0 AND 1),
    PRIMARY KEY (source_type, source_id, target_type, target_id, relationship)
);

CREATE TABLE IF NOT EXISTS entities (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    type        TEXT NOT NULL CHECK (type IN ('concept', 'file', 'decision', 'term')),
    name        TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}',
    confidence  REAL NOT NULL CHECK (confidence BETWEEN 0 AND 1),
    UNIQUE (type, name COLLATE NOCASE)
);

CREATE TABLE IF NOT EXISTS session_entities (
    session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    entity_id   INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    frequency   INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (session_id, entity_id)
);

CREATE TABLE IF NOT EXISTS entity_links (
    source_entity_id  INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    target_entity_id  INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    relationship      TEXT NOT NULL,
    weight            REAL NOT NULL CHECK (weight BETWEEN 0 AND 1),
    PRIMARY KEY (source_entity_id, target_entity_id, relationship)
);

CREATE TABLE IF NOT EXISTS extraction_state (
    id                  TEXT PRIMARY KEY,
    status              TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_progress', 'complete', 'error')),
    started_at          TEXT NOT NULL,
    completed_at        TEXT,
    messages_extracted  INTEGER NOT NULL DEFAULT 0,
    file_mtime          INTEGER,
    file_size           INTEGER,
    error_message       TEXT
);
"#];

/// Apply every migration newer than the database's current `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<(), MemoryNexusError> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {version}"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn all_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let tables = [
            "sessions",
            "messages_meta",
            "messages_fts",
            "tool_uses",
            "links",
            "entities",
            "session_entities",
            "entity_links",
            "extraction_state",
        ];
        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "table {table} should exist");
        }
    }

    #[test]
    fn fts_trigger_mirrors_insert_update_delete() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO sessions (id, project_path_encoded, project_path_decoded, project_name, start_time) VALUES ('s1','-p','/p','p','2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages_meta (id, session_id, role, content, timestamp) VALUES ('m1','s1','user','hello world','2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM messages_fts WHERE messages_fts MATCH 'hello'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        conn.execute("UPDATE messages_meta SET content = 'goodbye world' WHERE id = 'm1'", [])
            .unwrap();
        let old_count: i32 = conn
            .query_row("SELECT COUNT(*) FROM messages_fts WHERE messages_fts MATCH 'hello'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(old_count, 0);
        let new_count: i32 = conn
            .query_row("SELECT COUNT(*) FROM messages_fts WHERE messages_fts MATCH 'goodbye'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(new_count, 1);

        conn.execute("DELETE FROM messages_meta WHERE id = 'm1'", []).unwrap();
        let after_delete: i32 = conn
            .query_row("SELECT COUNT(*) FROM messages_fts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(after_delete, 0);
    }

    #[test]
    fn entities_unique_by_type_and_case_insensitive_name() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO entities (type, name, confidence) VALUES ('concept', 'Rust', 0.8)",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO entities (type, name, confidence) VALUES ('concept', 'rust', 0.9)",
            [],
        );
        assert!(result.is_err());
    }
}
