use chatrobot_shared::MessageStatus;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::live::Change;
use crate::models::{Message, NewMessage};

const MESSAGE_COLUMNS: &str =
    "id, name, time, content, user_id, is_self, session_id, image_uri, status";

impl Database {
    /// Insert a message into a conversation owned by the same user.
    pub fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        let owner: Option<i64> = self
            .conn()
            .query_row(
                "SELECT user_id FROM conversations WHERE id = ?1",
                params![message.session_id],
                |row| row.get(0),
            )
            .optional()?;
        if owner != Some(message.user_id) {
            return Err(StoreError::InvalidSession {
                session_id: message.session_id,
                user_id: message.user_id,
            });
        }

        self.conn().execute(
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
                message.status.as_str(),
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.notify(Change::Messages {
            session_id: message.session_id,
        });

        Ok(Message {
            id,
            name: message.name.clone(),
            time: message.time,
            content: message.content.clone(),
            user_id: message.user_id,
            is_self: message.is_self,
            session_id: message.session_id,
            image_uri: message.image_uri.clone(),
            status: message.status,
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Every message of a conversation, oldest first.
    pub fn messages_for_session(&self, session_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE session_id = ?1
             ORDER BY time ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![session_id], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// The last `limit` messages of a conversation, oldest first.
    pub fn recent_messages(&self, session_id: i64, limit: usize) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE session_id = ?1
             ORDER BY time DESC, id DESC
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![session_id, limit as i64], row_to_message)?;
        let mut messages = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)?;
        messages.reverse();
        Ok(messages)
    }

    /// The newest message the user wrote in a conversation.
    pub fn last_self_message(&self, session_id: i64) -> Result<Option<Message>> {
        let message = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS}
                     FROM messages
                     WHERE session_id = ?1 AND is_self = 1
                     ORDER BY time DESC, id DESC
                     LIMIT 1"
                ),
                params![session_id],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    /// The newest non-null image reference in a conversation.
    pub fn latest_image_uri(&self, session_id: i64) -> Result<Option<String>> {
        let uri = self
            .conn()
            .query_row(
                "SELECT image_uri
                 FROM messages
                 WHERE session_id = ?1 AND image_uri IS NOT NULL
                 ORDER BY time DESC, id DESC
                 LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(uri)
    }

    pub fn update_message_status(&self, id: i64, status: MessageStatus) -> Result<bool> {
        self.update_message(id, |conn| {
            conn.execute(
                "UPDATE messages SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
        })
    }

    pub fn update_message_content_and_status(
        &self,
        id: i64,
        content: &str,
        status: MessageStatus,
    ) -> Result<bool> {
        self.update_message(id, |conn| {
            conn.execute(
                "UPDATE messages SET content = ?1, status = ?2 WHERE id = ?3",
                params![content, status.as_str(), id],
            )
        })
    }

    pub fn update_message_image(&self, id: i64, image_uri: Option<&str>) -> Result<bool> {
        self.update_message(id, |conn| {
            conn.execute(
                "UPDATE messages SET image_uri = ?1 WHERE id = ?2",
                params![image_uri, id],
            )
        })
    }

    // look up the session first so the right live queries hear about it
    fn update_message<F>(&self, id: i64, update: F) -> Result<bool>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<usize>,
    {
        let session_id: Option<i64> = self
            .conn()
            .query_row(
                "SELECT session_id FROM messages WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(session_id) = session_id else {
            return Ok(false);
        };

        let affected = update(self.conn())?;
        self.notify(Change::Messages { session_id });
        Ok(affected > 0)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let status_str: String = row.get(8)?;
    let status = status_str.parse::<MessageStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: row.get(0)?,
        name: row.get(1)?,
        time: row.get(2)?,
        content: row.get(3)?,
        user_id: row.get(4)?,
        is_self: row.get(5)?,
        session_id: row.get(6)?,
        image_uri: row.get(7)?,
        status,
    })
}
