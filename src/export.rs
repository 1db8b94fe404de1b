//! JSON snapshot of the whole database, and its restore path.
//!
//! The export format is a flat array per table rather than a graph, so
//! import is a straight bulk insert; referential integrity is preserved by
//! inserting in dependency order (sessions before messages, entities before
//! session_entities, etc).

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::MemoryNexusError;
use crate::stats::{self, Stats};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: String,
    pub project_path_encoded: String,
    pub project_path_decoded: String,
    pub project_name: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub message_count: i64,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: String,
    pub tool_use_ids: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseRow {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub input: String,
    pub timestamp: String,
    pub status: String,
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub id: i64,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub metadata: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRow {
    pub source_type: String,
    pub source_id: String,
    pub target_type: String,
    pub target_id: String,
    pub relationship: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntityRow {
    pub session_id: String,
    pub entity_id: i64,
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLinkRow {
    pub source_entity_id: i64,
    pub target_entity_id: i64,
    pub relationship: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStateRow {
    pub id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub messages_extracted: i64,
    pub file_mtime: Option<i64>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: String,
    pub stats: Stats,
    pub sessions: Vec<SessionRow>,
    pub messages: Vec<MessageRow>,
    pub tool_uses: Vec<ToolUseRow>,
    pub entities: Vec<EntityRow>,
    pub links: Vec<LinkRow>,
    pub session_entities: Vec<SessionEntityRow>,
    pub entity_links: Vec<EntityLinkRow>,
    pub extraction_states: Vec<ExtractionStateRow>,
}

/// Snapshot every table into one document, ordered by primary key so a
/// later round-trip comparison is stable.
pub fn export(conn: &Connection, exported_at: &str) -> Result<ExportDocument, MemoryNexusError> {
    Ok(ExportDocument {
        version: EXPORT_VERSION.to_string(),
        exported_at: exported_at.to_string(),
        stats: stats::compute(conn, 10)?,
        sessions: query_all(
            conn,
            "SELECT id, project_path_encoded, project_path_decoded, project_name, start_time, end_time, message_count, summary
             FROM sessions ORDER BY id",
            |r| {
                Ok(SessionRow {
                    id: r.get(0)?,
                    project_path_encoded: r.get(1)?,
                    project_path_decoded: r.get(2)?,
                    project_name: r.get(3)?,
                    start_time: r.get(4)?,
                    end_time: r.get(5)?,
                    message_count: r.get(6)?,
                    summary: r.get(7)?,
                })
            },
        )?,
        messages: query_all(
            conn,
            "SELECT id, session_id, role, content, timestamp, tool_use_ids FROM messages_meta ORDER BY id",
            |r| {
                Ok(MessageRow {
                    id: r.get(0)?,
                    session_id: r.get(1)?,
                    role: r.get(2)?,
                    content: r.get(3)?,
                    timestamp: r.get(4)?,
                    tool_use_ids: r.get(5)?,
                })
            },
        )?,
        tool_uses: query_all(
            conn,
            "SELECT id, session_id, name, input, timestamp, status, result FROM tool_uses ORDER BY id",
            |r| {
                Ok(ToolUseRow {
                    id: r.get(0)?,
                    session_id: r.get(1)?,
                    name: r.get(2)?,
                    input: r.get(3)?,
                    timestamp: r.get(4)?,
                    status: r.get(5)?,
                    result: r.get(6)?,
                })
            },
        )?,
        entities: query_all(
            conn,
            "SELECT id, type, name, metadata, confidence FROM entities ORDER BY id",
            |r| {
                Ok(EntityRow {
                    id: r.get(0)?,
                    entity_type: r.get(1)?,
                    name: r.get(2)?,
                    metadata: r.get(3)?,
                    confidence: r.get(4)?,
                })
            },
        )?,
        links: query_all(
            conn,
            "SELECT source_type, source_id, target_type, target_id, relationship, weight
             FROM links ORDER BY source_type, source_id, target_type, target_id, relationship",
            |r| {
                Ok(LinkRow {
                    source_type: r.get(0)?,
                    source_id: r.get(1)?,
                    target_type: r.get(2)?,
                    target_id: r.get(3)?,
                    relationship: r.get(4)?,
                    weight: r.get(5)?,
                })
            },
        )?,
        session_entities: query_all(
            conn,
            "SELECT session_id, entity_id, frequency FROM session_entities ORDER BY session_id, entity_id",
            |r| {
                Ok(SessionEntityRow {
                    session_id: r.get(0)?,
                    entity_id: r.get(1)?,
                    frequency: r.get(2)?,
                })
            },
        )?,
        entity_links: query_all(
            conn,
            "SELECT source_entity_id, target_entity_id, relationship, weight
             FROM entity_links ORDER BY source_entity_id, target_entity_id, relationship",
            |r| {
                Ok(EntityLinkRow {
                    source_entity_id: r.get(0)?,
                    target_entity_id: r.get(1)?,
                    relationship: r.get(2)?,
                    weight: r.get(3)?,
                })
            },
        )?,
        extraction_states: query_all(
            conn,
            "SELECT id, status, started_at, completed_at, messages_extracted, file_mtime, file_size, error_message
             FROM extraction_state ORDER BY id",
            |r| {
                Ok(ExtractionStateRow {
                    id: r.get(0)?,
                    status: r.get(1)?,
                    started_at: r.get(2)?,
                    completed_at: r.get(3)?,
                    messages_extracted: r.get(4)?,
                    file_mtime: r.get(5)?,
                    file_size: r.get(6)?,
                    error_message: r.get(7)?,
                })
            },
        )?,
    })
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    row_map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, MemoryNexusError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], row_map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Restore an export document into `conn`. `clear_existing` wipes every
/// table first (in FK-safe order); otherwise rows are inserted idempotently
/// and a row that already exists by primary key is left untouched.
pub fn import(conn: &mut Connection, doc: &ExportDocument, clear_existing: bool) -> Result<(), MemoryNexusError> {
    if doc.version != EXPORT_VERSION {
        return Err(MemoryNexusError::ExportInvalid(format!(
            "unsupported export version: {}",
            doc.version
        )));
    }

    let tx = conn.transaction()?;

    if clear_existing {
        for table in [
            "entity_links",
            "session_entities",
            "entities",
            "links",
            "tool_uses",
            "messages_meta",
            "extraction_state",
            "sessions",
        ] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
    }

    for s in &doc.sessions {
        tx.execute(
            "INSERT INTO sessions (id, project_path_encoded, project_path_decoded, project_name, start_time, end_time, message_count, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![
                s.id, s.project_path_encoded, s.project_path_decoded, s.project_name,
                s.start_time, s.end_time, s.message_count, s.summary
            ],
        )?;
    }
    for m in &doc.messages {
        tx.execute(
            "INSERT INTO messages_meta (id, session_id, role, content, timestamp, tool_use_ids)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![m.id, m.session_id, m.role, m.content, m.timestamp, m.tool_use_ids],
        )?;
    }
    for t in &doc.tool_uses {
        tx.execute(
            "INSERT INTO tool_uses (id, session_id, name, input, timestamp, status, result)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![t.id, t.session_id, t.name, t.input, t.timestamp, t.status, t.result],
        )?;
    }
    for e in &doc.entities {
        tx.execute(
            "INSERT INTO entities (id, type, name, metadata, confidence) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![e.id, e.entity_type, e.name, e.metadata, e.confidence],
        )?;
    }
    for l in &doc.links {
        tx.execute(
            "INSERT INTO links (source_type, source_id, target_type, target_id, relationship, weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(source_type, source_id, target_type, target_id, relationship) DO NOTHING",
            rusqlite::params![l.source_type, l.source_id, l.target_type, l.target_id, l.relationship, l.weight],
        )?;
    }
    for se in &doc.session_entities {
        tx.execute(
            "INSERT INTO session_entities (session_id, entity_id, frequency) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id, entity_id) DO NOTHING",
            rusqlite::params![se.session_id, se.entity_id, se.frequency],
        )?;
    }
    for el in &doc.entity_links {
        tx.execute(
            "INSERT INTO entity_links (source_entity_id, target_entity_id, relationship, weight) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_entity_id, target_entity_id, relationship) DO NOTHING",
            rusqlite::params![el.source_entity_id, el.target_entity_id, el.relationship, el.weight],
        )?;
    }
    for es in &doc.extraction_states {
        tx.execute(
            "INSERT INTO extraction_state (id, status, started_at, completed_at, messages_extracted, file_mtime, file_size, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![
                es.id, es.status, es.started_at, es.completed_at,
                es.messages_extracted, es.file_mtime, es.file_size, es.error_message
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Parse a document from a reader, validating the minimal required fields
/// per spec §7's `ExportInvalid` trigger (missing `version`/`sessions`/`stats`).
pub fn parse(content: &str) -> Result<ExportDocument, MemoryNexusError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let obj = value
        .as_object()
        .ok_or_else(|| MemoryNexusError::ExportInvalid("not a JSON object".to_string()))?;
    for required in ["version", "sessions", "stats"] {
        if !obj.contains_key(required) {
            return Err(MemoryNexusError::ExportInvalid(format!("missing field: {required}")));
        }
    }
    serde_json::from_value(value).map_err(|e| MemoryNexusError::ExportInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{entities, messages, sessions, tool_uses};
    use crate::db::Connection as DbConnection;

    fn seeded_db() -> DbConnection {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        messages::insert(conn, "m1", "s1", "user", "hello", "2026-01-01T00:00:00Z", None).unwrap();
        tool_uses::insert_pending(conn, "t1", "s1", "Bash", "{}", "2026-01-01T00:00:00Z").unwrap();
        let entity = entities::save(conn, "file", "/p/main.rs", "{}", 1.0).unwrap();
        entities::link_session_entity(conn, "s1", entity.id, 1).unwrap();
        db
    }

    #[test]
    fn export_then_import_round_trips_every_table() {
        let source = seeded_db();
        let doc = export(source.raw(), "2026-01-28T12:00:00Z").unwrap();
        assert_eq!(doc.version, EXPORT_VERSION);
        assert_eq!(doc.sessions.len(), 1);
        assert_eq!(doc.messages.len(), 1);
        assert_eq!(doc.tool_uses.len(), 1);
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.session_entities.len(), 1);

        let mut target = DbConnection::open_in_memory().unwrap();
        import(target.raw_mut(), &doc, false).unwrap();
        let redoc = export(target.raw(), "2026-01-28T12:00:01Z").unwrap();

        assert_eq!(redoc.sessions, doc.sessions);
        assert_eq!(redoc.messages, doc.messages);
        assert_eq!(redoc.tool_uses, doc.tool_uses);
        assert_eq!(redoc.entities, doc.entities);
        assert_eq!(redoc.session_entities, doc.session_entities);
    }

    #[test]
    fn import_is_idempotent_without_clear_existing() {
        let source = seeded_db();
        let doc = export(source.raw(), "2026-01-28T12:00:00Z").unwrap();

        let mut target = DbConnection::open_in_memory().unwrap();
        import(target.raw_mut(), &doc, false).unwrap();
        import(target.raw_mut(), &doc, false).unwrap();

        let count: i64 = target.raw().query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn parse_rejects_document_missing_required_fields() {
        let result = parse(r#"{"version":"1.0"}"#);
        assert!(matches!(result, Err(MemoryNexusError::ExportInvalid(_))));
    }

    #[test]
    fn import_rejects_unknown_version() {
        let mut doc_value: serde_json::Value = serde_json::from_str(
            &serde_json::to_string(&export(seeded_db().raw(), "2026-01-28T12:00:00Z").unwrap()).unwrap(),
        )
        .unwrap();
        doc_value["version"] = serde_json::json!("2.0");
        let doc: ExportDocument = serde_json::from_value(doc_value).unwrap();

        let mut target = DbConnection::open_in_memory().unwrap();
        let result = import(target.raw_mut(), &doc, false);
        assert!(matches!(result, Err(MemoryNexusError::ExportInvalid(_))));
    }
}
