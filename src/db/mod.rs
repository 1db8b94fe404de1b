//! Database connection: open, configure, verify FTS5, run migrations.

pub mod migrations;
pub mod repositories;

use std::path::Path;

use rusqlite::Connection as RusqliteConnection;

use crate::error::MemoryNexusError;

/// Owns the single database handle for the process's lifetime.
pub struct Connection {
    conn: RusqliteConnection,
}

impl Connection {
    /// Open (or create) the database at `path`, configure pragmas, probe FTS5
    /// support, and run pending migrations.
    pub fn open(path: &Path) -> Result<Self, MemoryNexusError> {
        let conn = RusqliteConnection::open(path)?;
        let this = Self::from_raw(conn)?;
        restrict_permissions(path)?;
        Ok(this)
    }

    /// Open an in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, MemoryNexusError> {
        let conn = RusqliteConnection::open_in_memory()?;
        Self::from_raw(conn)
    }

    fn from_raw(conn: RusqliteConnection) -> Result<Self, MemoryNexusError> {
        configure_pragmas(&conn)?;
        probe_fts5(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(Connection { conn })
    }

    /// Borrow the underlying `rusqlite` connection for repository and search
    /// queries.
    pub fn raw(&self) -> &RusqliteConnection {
        &self.conn
    }

    /// Mutable access, needed to open a transaction (the sync orchestrator's
    /// per-file atomicity boundary).
    pub fn raw_mut(&mut self) -> &mut RusqliteConnection {
        &mut self.conn
    }
}

fn configure_pragmas(conn: &RusqliteConnection) -> Result<(), MemoryNexusError> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // journal_mode is a no-op (stays "memory") for :memory: connections; WAL
    // only takes effect for file-backed databases, per spec §4.5.
    let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0)).unwrap_or_default();
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", -64_000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

/// Restrict the database file, and its WAL/shared-memory sidecar files, to
/// user-only access (0600), per spec §6. The sidecars are created by SQLite
/// itself under `journal_mode=WAL` at the process umask, so they need the
/// same hardening as the main file or recently-written content sitting in
/// the WAL stays group/world-readable. A sidecar that doesn't exist yet is
/// not an error — it's created on first write and chmodded on the next open.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), MemoryNexusError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms.clone())?;

    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_os_string();
        sidecar.push(suffix);
        let sidecar = std::path::PathBuf::from(sidecar);
        if sidecar.exists() {
            std::fs::set_permissions(&sidecar, perms.clone())?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), MemoryNexusError> {
    Ok(())
}

/// Create and drop a temporary FTS5 virtual table; fail fast if unsupported.
fn probe_fts5(conn: &RusqliteConnection) -> Result<(), MemoryNexusError> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS __fts5_probe USING fts5(x);
         DROP TABLE __fts5_probe;",
    )
    .map_err(|_| MemoryNexusError::FtsUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_in_memory_runs_migrations() {
        let conn = Connection::open_in_memory().unwrap();
        let version: i32 = conn
            .raw()
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }

    #[test]
    fn open_file_backed_uses_wal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        let mode: String = conn
            .raw()
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn foreign_keys_are_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        let enabled: i32 = conn
            .raw()
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    #[cfg(unix)]
    fn file_backed_database_is_user_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        Connection::open(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn wal_sidecar_is_user_only_when_present() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        Connection::open(&path).unwrap();
        let wal_path = dir.path().join("test.db-wal");
        if wal_path.exists() {
            let mode = std::fs::metadata(&wal_path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
