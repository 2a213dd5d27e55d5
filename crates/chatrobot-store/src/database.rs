//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  It also owns the sending
//! half of the change feed that [`crate::LiveQuery`] listens on.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::live::Change;
use crate::migrations;

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Handle shared between the orchestrator, its background tasks and live
/// queries.  Guards must never be held across an `.await`.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Lock a shared database, mapping poisoning to [`StoreError::LockPoisoned`].
pub fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>> {
    db.lock().map_err(|_| StoreError::LockPoisoned)
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    changes: broadcast::Sender<Change>,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/chatrobot/chatrobot.db`
    /// - macOS:   `~/Library/Application Support/com.yx.chatrobot/chatrobot.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\yx\chatrobot\data\chatrobot.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "yx", "chatrobot").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("chatrobot.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory database.  Used by tests and previews.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Cascading deletes of messages depend on this.
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self { conn, changes })
    }

    /// Wrap the database for sharing across tasks.
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Subscribe to every change written through this handle.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    pub(crate) fn notify(&self, change: Change) {
        // No subscribers is the normal case outside of a rendered screen.
        let _ = self.changes.send(change);
    }
}
