//! Thread-safe SQLite connection wrapper.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::migrations;

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;";

const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// Shared SQLite connection guarded by a `parking_lot::Mutex`.
///
/// Cloning is cheap and shares the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open or create a database file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(FILE_PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        let applied = migrations::run_migrations(&conn)?;

        info!(path = %path.display(), applied, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(MEMORY_PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        let _ = migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Execute a closure with the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Location the database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.path(), Path::new(":memory:"));
        let version = db
            .with_conn(migrations::current_version)
            .unwrap();
        assert_eq!(version, migrations::latest_version());
    }

    #[test]
    fn open_file_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("palaver.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        let again = Database::open(&path).unwrap();
        drop(db);
        drop(again);
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = Database::in_memory().unwrap();
        let err = db
            .with_conn(|conn| {
                let _ = conn.execute(
                    "INSERT INTO messages (sender_id, receiver_id, content, timestamp)
                     VALUES (1, 2, 'x', '2026-01-01T00:00:00Z')",
                    [],
                )?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
