//! Full-text search over `messages_fts`, with ranking, snippets, and
//! filters.

use rusqlite::Connection;

use crate::error::MemoryNexusError;

/// One search hit, already ranked and snippet-formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub session_id: String,
    pub message_id: String,
    pub role: String,
    pub snippet: String,
    pub score: f64,
    pub timestamp: String,
}

/// A set of roles to filter by (e.g. `user` only, or `user` + `assistant`).
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub project_filter: Option<String>,
    pub role_filter: Vec<String>,
    pub session_filter: Option<String>,
    pub since: Option<String>,
    pub before: Option<String>,
    pub case_sensitive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            limit: 20,
            project_filter: None,
            role_filter: Vec::new(),
            session_filter: None,
            since: None,
            before: None,
            case_sensitive: false,
        }
    }
}

struct RawRow {
    message_id: String,
    session_id: String,
    role: String,
    content: String,
    timestamp: String,
    snippet: String,
    score: f64,
}

/// Run a full-text search. `query` must be non-empty.
pub fn search(
    conn: &Connection,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>, MemoryNexusError> {
    if query.trim().is_empty() {
        return Err(MemoryNexusError::EmptyQuery);
    }

    let fetch_limit = if options.case_sensitive {
        options.limit * 2
    } else {
        options.limit
    };

    let mut sql = String::from(
        "SELECT m.id, m.session_id, m.role, m.content, m.timestamp, \
         bm25(messages_fts) AS score, \
         snippet(messages_fts, 0, '<mark>', '</mark>', '...', 64) AS snip \
         FROM messages_fts \
         JOIN messages_meta m ON m.rowid = messages_fts.rowid",
    );
    if options.project_filter.is_some() {
        sql.push_str(" JOIN sessions s ON s.id = m.session_id");
    }
    sql.push_str(" WHERE messages_fts MATCH ?1");

    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(query.to_string())];

    if let Some(project) = &options.project_filter {
        sql.push_str(&format!(" AND s.project_path_encoded = ?{}", params.len() + 1));
        params.push(Box::new(project.clone()));
    }
    if !options.role_filter.is_empty() {
        let mut placeholders = Vec::with_capacity(options.role_filter.len());
        for role in &options.role_filter {
            params.push(Box::new(role.clone()));
            placeholders.push(format!("?{}", params.len()));
        }
        sql.push_str(&format!(" AND m.role IN ({})", placeholders.join(", ")));
    }
    if let Some(session) = &options.session_filter {
        sql.push_str(&format!(" AND m.session_id = ?{}", params.len() + 1));
        params.push(Box::new(session.clone()));
    }
    if let Some(since) = &options.since {
        sql.push_str(&format!(" AND m.timestamp >= ?{}", params.len() + 1));
        params.push(Box::new(since.clone()));
    }
    if let Some(before) = &options.before {
        sql.push_str(&format!(" AND m.timestamp < ?{}", params.len() + 1));
        params.push(Box::new(before.clone()));
    }
    sql.push_str(" ORDER BY score");
    sql.push_str(&format!(" LIMIT ?{}", params.len() + 1));
    params.push(Box::new(fetch_limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(RawRow {
            message_id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            timestamp: row.get(4)?,
            score: row.get(5)?,
            snippet: row.get(6)?,
        })
    })?;

    let mut raw: Vec<RawRow> = Vec::new();
    for row in rows {
        raw.push(row?);
    }

    if options.case_sensitive {
        raw.retain(|r| r.content.contains(query));
        raw.truncate(options.limit);
    }

    Ok(normalize_scores(raw))
}

/// Normalize raw BM25 scores (lower = better) to `[0,1]` (higher = better).
/// A single row, or a set of all-equal scores, normalizes to `1.0`.
fn normalize_scores(rows: Vec<RawRow>) -> Vec<SearchResult> {
    if rows.is_empty() {
        return Vec::new();
    }
    let min = rows.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
    let max = rows.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;

    rows.into_iter()
        .map(|r| {
            let normalized = if spread.abs() < f64::EPSILON {
                1.0
            } else {
                (max - r.score) / spread
            };
            SearchResult {
                session_id: r.session_id,
                message_id: r.message_id,
                role: r.role,
                snippet: r.snippet,
                score: normalized,
                timestamp: r.timestamp,
            }
        })
        .collect()
}
