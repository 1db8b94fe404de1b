//! Entity persistence: max-confidence upsert, session-entity frequency, and
//! entity-to-entity links.

use rusqlite::{Connection, OptionalExtension};

use crate::error::MemoryNexusError;

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: i64,
    pub entity_type: String,
    pub name: String,
    pub metadata: String,
    pub confidence: f64,
}

/// Create an entity, or — if `(type, lower(name))` already exists — raise
/// its confidence to `max(existing, new)` and leave it untouched otherwise.
/// Always returns the entity as it now stands.
pub fn save(
    conn: &Connection,
    entity_type: &str,
    name: &str,
    metadata: &str,
    confidence: f64,
) -> Result<Entity, MemoryNexusError> {
    let existing: Option<Entity> = conn
        .query_row(
            "SELECT id, type, name, metadata, confidence FROM entities
             WHERE type = ?1 AND name = ?2 COLLATE NOCASE",
            rusqlite::params![entity_type, name],
            row_to_entity,
        )
        .optional()?;

    match existing {
        Some(e) if confidence > e.confidence => {
            conn.execute(
                "UPDATE entities SET confidence = ?1 WHERE id = ?2",
                rusqlite::params![confidence, e.id],
            )?;
            Ok(Entity { confidence, ..e })
        }
        Some(e) => Ok(e),
        None => {
            conn.execute(
                "INSERT INTO entities (type, name, metadata, confidence) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![entity_type, name, metadata, confidence],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Entity {
                id,
                entity_type: entity_type.to_string(),
                name: name.to_string(),
                metadata: metadata.to_string(),
                confidence,
            })
        }
    }
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        entity_type: row.get(1)?,
        name: row.get(2)?,
        metadata: row.get(3)?,
        confidence: row.get(4)?,
    })
}

/// Link a session to an entity, incrementing frequency on repeat
/// observation.
pub fn link_session_entity(
    conn: &Connection,
    session_id: &str,
    entity_id: i64,
    frequency: i64,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO session_entities (session_id, entity_id, frequency)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(session_id, entity_id) DO UPDATE SET frequency = frequency + excluded.frequency",
        rusqlite::params![session_id, entity_id, frequency],
    )?;
    Ok(())
}

/// Link one entity to another; idempotent — a repeat observation of the same
/// (source, target, relationship) tuple is ignored rather than updated,
/// since entity-to-entity weight is fixed at first observation.
pub fn link_entities(
    conn: &Connection,
    source_entity_id: i64,
    target_entity_id: i64,
    relationship: &str,
    weight: f64,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO entity_links (source_entity_id, target_entity_id, relationship, weight)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(source_entity_id, target_entity_id, relationship) DO NOTHING",
        rusqlite::params![source_entity_id, target_entity_id, relationship, weight],
    )?;
    Ok(())
}

pub fn frequency_of(conn: &Connection, session_id: &str, entity_id: i64) -> Result<i64, MemoryNexusError> {
    Ok(conn.query_row(
        "SELECT frequency FROM session_entities WHERE session_id = ?1 AND entity_id = ?2",
        rusqlite::params![session_id, entity_id],
        |r| r.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::sessions;
    use crate::db::Connection as DbConnection;

    #[test]
    fn save_creates_then_raises_confidence_only_when_higher() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        let e1 = save(conn, "concept", "Rust", "{}", 0.4).unwrap();
        let e2 = save(conn, "concept", "rust", "{}", 0.2).unwrap();
        assert_eq!(e1.id, e2.id);
        assert_eq!(e2.confidence, 0.4); // lower observation does not win

        let e3 = save(conn, "concept", "RUST", "{}", 0.9).unwrap();
        assert_eq!(e3.confidence, 0.9);
    }

    #[test]
    fn link_session_entity_accumulates_frequency() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        sessions::ensure_exists(conn, "s1", "-p", "/p", "p", "2026-01-01T00:00:00Z").unwrap();
        let entity = save(conn, "concept", "Rust", "{}", 0.5).unwrap();
        link_session_entity(conn, "s1", entity.id, 1).unwrap();
        link_session_entity(conn, "s1", entity.id, 1).unwrap();
        assert_eq!(frequency_of(conn, "s1", entity.id).unwrap(), 2);
    }

    #[test]
    fn link_entities_is_idempotent() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.raw();
        let a = save(conn, "concept", "Rust", "{}", 0.5).unwrap();
        let b = save(conn, "concept", "Cargo", "{}", 0.5).unwrap();
        link_entities(conn, a.id, b.id, "relates_to", 0.7).unwrap();
        link_entities(conn, a.id, b.id, "relates_to", 0.9).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entity_links", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let weight: f64 = conn.query_row("SELECT weight FROM entity_links LIMIT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(weight, 0.7); // first observation's weight wins, not overwritten
    }
}
