//! Generic source/target relationship links, idempotent upsert.

use rusqlite::Connection;

use crate::error::MemoryNexusError;

/// Insert a link, or update its weight if the composite key already exists.
pub fn with_weight(
    conn: &Connection,
    source_type: &str,
    source_id: &str,
    target_type: &str,
    target_id: &str,
    relationship: &str,
    weight: f64,
) -> Result<(), MemoryNexusError> {
    conn.execute(
        "INSERT INTO links (source_type, source_id, target_type, target_id, relationship, weight)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source_type, source_id, target_type, target_id, relationship)
         DO UPDATE SET weight = excluded.weight",
        rusqlite::params![source_type, source_id, target_type, target_id, relationship, weight],
    )?;
    Ok(())
}

pub fn count(conn: &Connection) -> Result<i64, MemoryNexusError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM links", [], |r| r.get(0))?)
}
