use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A message named a conversation that does not exist or belongs to
    /// another user.
    #[error("Conversation {session_id} is not owned by user {user_id}")]
    InvalidSession { session_id: i64, user_id: i64 },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the database lock.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// The change feed was dropped while a live query was waiting on it.
    #[error("Change feed closed")]
    FeedClosed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
