use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::live::Change;
use crate::models::User;

impl Database {
    pub fn create_user(
        &self,
        name: &str,
        description: &str,
        avatar_uri: Option<&str>,
    ) -> Result<User> {
        self.conn().execute(
            "INSERT INTO users (name, description, avatar_uri) VALUES (?1, ?2, ?3)",
            params![name, description, avatar_uri],
        )?;
        let id = self.conn().last_insert_rowid();
        self.notify(Change::User { user_id: id });

        Ok(User {
            id,
            name: name.to_string(),
            description: description.to_string(),
            avatar_uri: avatar_uri.map(str::to_string),
        })
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, name, description, avatar_uri FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// The oldest local user, i.e. the one created on first launch.
    pub fn first_user(&self) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, name, description, avatar_uri FROM users ORDER BY id ASC LIMIT 1",
                [],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Overwrite the editable profile fields.  Returns `true` if the user exists.
    pub fn update_user(&self, user: &User) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET name = ?1, description = ?2, avatar_uri = ?3 WHERE id = ?4",
            params![user.name, user.description, user.avatar_uri, user.id],
        )?;
        if affected > 0 {
            self.notify(Change::User { user_id: user.id });
        }
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        avatar_uri: row.get(3)?,
    })
}
