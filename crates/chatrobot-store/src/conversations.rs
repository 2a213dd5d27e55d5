//! CRUD operations for [`Conversation`] records.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::live::Change;
use crate::models::Conversation;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new conversation and return it with its assigned id.
    pub fn create_conversation(
        &self,
        user_id: i64,
        title: &str,
        created_time: i64,
    ) -> Result<Conversation> {
        self.conn().execute(
            "INSERT INTO conversations (title, created_time, user_id) VALUES (?1, ?2, ?3)",
            params![title, created_time, user_id],
        )?;
        let id = self.conn().last_insert_rowid();
        self.notify(Change::Conversations { user_id });

        Ok(Conversation {
            id,
            title: title.to_string(),
            created_time,
            user_id,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single conversation by id.
    pub fn get_conversation(&self, id: i64) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT id, title, created_time, user_id
                 FROM conversations
                 WHERE id = ?1",
                params![id],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List a user's conversations, newest first.
    pub fn list_conversations(&self, user_id: i64) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, created_time, user_id
             FROM conversations
             WHERE user_id = ?1
             ORDER BY created_time DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![user_id], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    /// The most recently created conversation of a user, if any.
    pub fn latest_conversation(&self, user_id: i64) -> Result<Option<Conversation>> {
        let conversation = self
            .conn()
            .query_row(
                "SELECT id, title, created_time, user_id
                 FROM conversations
                 WHERE user_id = ?1
                 ORDER BY created_time DESC, id DESC
                 LIMIT 1",
                params![user_id],
                row_to_conversation,
            )
            .optional()?;
        Ok(conversation)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn update_conversation_title(&self, id: i64, title: &str) -> Result<bool> {
        let conversation = match self.get_conversation(id) {
            Ok(c) => c,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.conn().execute(
            "UPDATE conversations SET title = ?1 WHERE id = ?2",
            params![title, id],
        )?;
        self.notify(Change::Conversations {
            user_id: conversation.user_id,
        });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a conversation.  ON DELETE CASCADE takes its messages with it.
    /// Returns `true` if a row was deleted.
    pub fn delete_conversation(&self, id: i64) -> Result<bool> {
        let conversation = match self.get_conversation(id) {
            Ok(c) => c,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        let affected = self
            .conn()
            .execute("DELETE FROM conversations WHERE id = ?1", params![id])?;

        self.notify(Change::Messages { session_id: id });
        self.notify(Change::Conversations {
            user_id: conversation.user_id,
        });
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        created_time: row.get(2)?,
        user_id: row.get(3)?,
    })
}
