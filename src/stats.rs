//! Aggregate counts and per-project breakdown.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::MemoryNexusError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBreakdown {
    pub project_name: String,
    pub session_count: i64,
    pub message_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_sessions: i64,
    pub total_messages: i64,
    pub total_tool_uses: i64,
    pub database_size_bytes: i64,
    pub breakdown: Vec<ProjectBreakdown>,
}

/// Compute stats with a per-project breakdown limited to `project_limit`
/// rows (default 10). `totalSessions`/`totalMessages` are the sum over the
/// *returned* breakdown rows, not the whole database, so the two numbers
/// stay consistent for a caller who only sees the top N projects.
pub fn compute(conn: &Connection, project_limit: i64) -> Result<Stats, MemoryNexusError> {
    let breakdown = project_breakdown(conn, project_limit)?;
    let total_sessions = breakdown.iter().map(|b| b.session_count).sum();
    let total_messages = breakdown.iter().map(|b| b.message_count).sum();
    let total_tool_uses: i64 = conn.query_row("SELECT COUNT(*) FROM tool_uses", [], |r| r.get(0))?;
    let database_size_bytes = database_size(conn)?;

    Ok(Stats {
        total_sessions,
        total_messages,
        total_tool_uses,
        database_size_bytes,
        breakdown,
    })
}

fn project_breakdown(conn: &Connection, limit: i64) -> Result<Vec<ProjectBreakdown>, MemoryNexusError> {
    let mut stmt = conn.prepare(
        "SELECT s.project_name, COUNT(DISTINCT s.id) AS session_count, COALESCE(SUM(s.message_count), 0) AS message_count
         FROM sessions s
         GROUP BY s.project_name
         ORDER BY session_count DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(ProjectBreakdown {
            project_name: row.get(0)?,
            session_count: row.get(1)?,
            message_count: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn database_size(conn: &Connection) -> Result<i64, MemoryNexusError> {
    let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
    let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
    Ok(page_count * page_size)
}
