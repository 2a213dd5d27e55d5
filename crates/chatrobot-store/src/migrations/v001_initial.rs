//! v001 -- Initial schema creation.
//!
//! Creates the four tables: `users`, `conversations`, `messages` and
//! `config`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    avatar_uri  TEXT
);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    created_time INTEGER NOT NULL,              -- unix seconds
    user_id      INTEGER NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_conversations_user_created
    ON conversations(user_id, created_time DESC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    time       INTEGER NOT NULL,                -- unix seconds
    content    TEXT NOT NULL,
    user_id    INTEGER NOT NULL,
    is_self    INTEGER NOT NULL,                -- boolean 0/1
    session_id INTEGER NOT NULL,                -- FK -> conversations(id)
    image_uri  TEXT,
    status     TEXT NOT NULL DEFAULT 'sent',    -- sent | loading | failed

    FOREIGN KEY (session_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_session_time
    ON messages(session_id, time, id);

-- ----------------------------------------------------------------
-- Config (one row per user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS config (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id           INTEGER NOT NULL UNIQUE,
    robot_name        TEXT NOT NULL,
    model             TEXT NOT NULL,
    max_tokens        INTEGER NOT NULL,
    temperature       REAL NOT NULL,
    top_p             REAL NOT NULL,
    frequency_penalty REAL NOT NULL,
    presence_penalty  REAL NOT NULL,
    system_prompt     TEXT NOT NULL,
    backend_url       TEXT NOT NULL DEFAULT '',

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
