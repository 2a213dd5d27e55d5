//! SQLite storage for mirrored rows.
//!
//! The relay keeps an append-only copy of what clients send it.  Rows are
//! never validated against each other, so `messages.session_id` carries no
//! foreign key.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chatrobot_shared::relay::RemoteMessage;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::ServerError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    time        INTEGER NOT NULL,
    content     TEXT NOT NULL,
    user_id     INTEGER NOT NULL,
    is_self     INTEGER NOT NULL,
    session_id  INTEGER NOT NULL,
    image_uri   TEXT,
    status      TEXT NOT NULL DEFAULT 'sent'
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, time);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    account       TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id  INTEGER NOT NULL,
    title    TEXT NOT NULL
);
"#;

/// A validated `POST /messages` row.
#[derive(Debug, Clone)]
pub struct NewRemoteMessage {
    pub name: String,
    pub time: i64,
    pub content: String,
    pub user_id: i64,
    pub is_self: bool,
    pub session_id: i64,
    pub image_uri: Option<String>,
    pub status: String,
}

pub struct RelayDb {
    conn: Mutex<Connection>,
}

impl RelayDb {
    pub fn open(path: &Path) -> Result<Self, ServerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ServerError::Internal(format!(
                        "Failed to create database directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!(path = %path.display(), "Relay database opened");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ServerError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ServerError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ServerError> {
        self.conn
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".to_string()))
    }

    pub fn insert_message(&self, message: &NewRemoteMessage) -> Result<i64, ServerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (name, time, content, user_id, is_self, session_id, image_uri, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.name,
                message.time,
                message.content,
                message.user_id,
                message.is_self,
                message.session_id,
                message.image_uri,
                message.status,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Messages of one session, oldest first.
    pub fn messages_for_session(&self, session_id: i64) -> Result<Vec<RemoteMessage>, ServerError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, time, content, user_id, is_self, session_id, image_uri, status
             FROM messages WHERE session_id = ?1 ORDER BY time ASC, id ASC",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok(RemoteMessage {
                id: row.get(0)?,
                name: row.get(1)?,
                time: row.get(2)?,
                content: row.get(3)?,
                user_id: row.get(4)?,
                is_self: row.get(5)?,
                session_id: row.get(6)?,
                image_uri: row.get(7)?,
                status: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a user or refresh the password hash and name of an existing
    /// account.
    pub fn upsert_user(&self, account: &str, password_hash: &str, name: &str) -> Result<(), ServerError> {
        self.conn()?.execute(
            "INSERT INTO users (account, password_hash, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(account) DO UPDATE SET
                 password_hash = excluded.password_hash,
                 name = excluded.name",
            params![account, password_hash, name],
        )?;
        Ok(())
    }

    pub fn insert_conversation(&self, user_id: i64, title: &str) -> Result<i64, ServerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversations (user_id, title) VALUES (?1, ?2)",
            params![user_id, title],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[cfg(test)]
    fn user_name(&self, account: &str) -> Result<Option<String>, ServerError> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn()?
            .query_row(
                "SELECT name FROM users WHERE account = ?1",
                [account],
                |row| row.get(0),
            )
            .optional()?)
    }
}
