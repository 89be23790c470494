//! SQLite handle for the message store.
//!
//! Webhook handlers, the capture relay and the CLI all append to the same
//! `user_questions` table, usually one short row at a time. The connection
//! is shared behind a mutex and tuned for that append-heavy, read-by-session
//! workload.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use voxmap_core::error::VoxmapError;

use crate::migrations;

/// Settings for every connection, in memory or on disk.
///
/// A second process (a `capture --follow` next to `serve`) may hold the
/// write lock briefly; waiting up to five seconds avoids spurious
/// `SQLITE_BUSY` failures on webhook inserts. Session scans sort by
/// timestamp, so temporary sort tables stay in memory.
const CONNECTION_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;
     PRAGMA temp_store = MEMORY;";

/// Settings that only apply to a database file.
///
/// WAL lets dashboards read sessions while captures are being written.
/// NORMAL sync can lose the last few inserts on power loss, never corrupt
/// the file. The 8 MiB page cache holds the hot tail of the table.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA cache_size = -8192;";

/// Mutex-guarded SQLite connection with the schema applied.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store file at `path`, creating parent
    /// directories, then apply pending migrations.
    pub fn new(path: &Path) -> Result<Self, VoxmapError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            VoxmapError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        apply_pragmas(&conn, FILE_PRAGMAS)?;

        let db = Self::from_connection(conn)?;
        info!(path = %path.display(), "Message database opened");
        Ok(db)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, VoxmapError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VoxmapError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, VoxmapError> {
        apply_pragmas(&conn, CONNECTION_PRAGMAS)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with shared access to the connection. The lock is held
    /// until `f` returns.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, VoxmapError>
    where
        F: FnOnce(&Connection) -> Result<T, VoxmapError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` with exclusive access to the connection, as needed to open
    /// a `rusqlite::Transaction` for multi-row writes.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, VoxmapError>
    where
        F: FnOnce(&mut Connection) -> Result<T, VoxmapError>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, VoxmapError> {
        self.conn
            .lock()
            .map_err(|e| VoxmapError::Storage(format!("Database lock poisoned: {}", e)))
    }
}

fn apply_pragmas(conn: &Connection, pragmas: &str) -> Result<(), VoxmapError> {
    conn.execute_batch(pragmas)
        .map_err(|e| VoxmapError::Storage(format!("Failed to set pragmas: {}", e)))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
