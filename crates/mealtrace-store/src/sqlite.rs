//! SQLite-backed key-value store.
//!
//! A single `kv` table holds every persisted value as a JSON string. An
//! optional byte capacity is enforced on write so the quota-pressure
//! evictor can be exercised against the same failure mode a size-limited
//! client store exhibits.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::kv::{KvBackend, KvError};

/// Current schema version. Bump and extend [`run_migrations`] whenever
/// the schema changes.
const CURRENT_VERSION: u32 = 1;

fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking kv store migrations"
    );

    if current < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}

/// [`KvBackend`] over a [`rusqlite::Connection`].
#[derive(Debug)]
pub struct SqliteKv {
    conn: Connection,
    /// Maximum total bytes of keys + values; `None` means unbounded.
    capacity_bytes: Option<usize>,
}

impl SqliteKv {
    /// Open (or create) the default application store.
    ///
    /// The database file is placed in the platform-appropriate data
    /// directory, e.g. `~/.local/share/mealtrace/mealtrace.db` on Linux.
    /// Open failures are reported as [`KvError::Unavailable`]: a store
    /// that cannot be opened is indistinguishable from blocked storage.
    pub fn new(capacity_bytes: Option<usize>) -> Result<Self, KvError> {
        let project_dirs = ProjectDirs::from("com", "mealtrace", "mealtrace")
            .ok_or_else(|| KvError::Unavailable("no application data directory".into()))?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| KvError::Unavailable(format!("cannot create data dir: {e}")))?;

        let db_path = data_dir.join("mealtrace.db");

        tracing::info!(path = %db_path.display(), "opening kv store");

        Self::open_at(&db_path, capacity_bytes)
    }

    /// Open (or create) a store at an explicit path. Used by tests and
    /// custom directory layouts.
    pub fn open_at(path: &Path, capacity_bytes: Option<usize>) -> Result<Self, KvError> {
        let conn = Connection::open(path)
            .map_err(|e| KvError::Unavailable(format!("cannot open database: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn,
            capacity_bytes,
        })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Total bytes currently stored, excluding `except_key` if present.
    fn used_bytes(&self, except_key: &str) -> Result<usize, KvError> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv WHERE key != ?1",
            params![except_key],
            |row| row.get(0),
        )?;
        Ok(used as usize)
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        if let Some(cap) = self.capacity_bytes {
            let incoming = key.len() + value.len();
            if self.used_bytes(key)? + incoming > cap {
                return Err(KvError::Full);
            }
        }

        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::probe;

    #[test]
    fn open_set_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut kv = SqliteKv::open_at(&path, None).expect("should open");
        assert!(kv.path().is_some());
        assert!(probe(&mut kv).is_ok());

        kv.set("goal", r#"{"kcal":2000}"#).unwrap();
        assert_eq!(kv.get("goal").unwrap().unwrap(), r#"{"kcal":2000}"#);
        assert!(kv.get("missing").unwrap().is_none());
    }

    #[test]
    fn unopenable_path_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // Missing parent directory: the open itself fails, which is the
        // same taxonomy bucket as blocked storage.
        let path = dir.path().join("missing").join("test.db");
        let err = SqliteKv::open_at(&path, None).unwrap_err();
        assert!(matches!(err, KvError::Unavailable(_)));
    }

    #[test]
    fn reopen_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut kv = SqliteKv::open_at(&path, None).unwrap();
            kv.set("language", "en").unwrap();
        }
        let kv = SqliteKv::open_at(&path, None).unwrap();
        assert_eq!(kv.get("language").unwrap().unwrap(), "en");
    }

    #[test]
    fn capacity_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut kv = SqliteKv::open_at(&path, Some(64)).unwrap();
        kv.set("a", &"x".repeat(40)).unwrap();
        let err = kv.set("b", &"y".repeat(40)).unwrap_err();
        assert!(matches!(err, KvError::Full));

        // Replacing an existing key counts the old entry as freed.
        kv.set("a", &"z".repeat(50)).unwrap();
    }
}
