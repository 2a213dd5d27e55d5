//! Per-user assistant config.  One row per user, created lazily.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::live::Change;
use crate::models::Config;

const CONFIG_COLUMNS: &str = "id, user_id, robot_name, model, max_tokens, temperature, top_p, \
     frequency_penalty, presence_penalty, system_prompt, backend_url";

impl Database {
    pub fn get_config(&self, user_id: i64) -> Result<Option<Config>> {
        let config = self
            .conn()
            .query_row(
                &format!("SELECT {CONFIG_COLUMNS} FROM config WHERE user_id = ?1"),
                params![user_id],
                row_to_config,
            )
            .optional()?;
        Ok(config)
    }

    /// Return the user's config, inserting the defaults first if there is none.
    pub fn ensure_config(&self, user_id: i64) -> Result<Config> {
        if let Some(config) = self.get_config(user_id)? {
            return Ok(config);
        }

        let mut config = Config::defaults_for(user_id);
        self.conn().execute(
            "INSERT INTO config (user_id, robot_name, model, max_tokens, temperature, top_p,
                                 frequency_penalty, presence_penalty, system_prompt, backend_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                config.user_id,
                config.robot_name,
                config.model,
                config.max_tokens,
                config.temperature,
                config.top_p,
                config.frequency_penalty,
                config.presence_penalty,
                config.system_prompt,
                config.backend_url,
            ],
        )?;
        config.id = self.conn().last_insert_rowid();

        tracing::debug!(user_id, "created default config");
        self.notify(Change::Config { user_id });
        Ok(config)
    }

    /// Overwrite the settings of `config.user_id`.  Returns `true` if a row existed.
    pub fn update_config(&self, config: &Config) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE config
             SET robot_name = ?1, model = ?2, max_tokens = ?3, temperature = ?4, top_p = ?5,
                 frequency_penalty = ?6, presence_penalty = ?7, system_prompt = ?8, backend_url = ?9
             WHERE user_id = ?10",
            params![
                config.robot_name,
                config.model,
                config.max_tokens,
                config.temperature,
                config.top_p,
                config.frequency_penalty,
                config.presence_penalty,
                config.system_prompt,
                config.backend_url,
                config.user_id,
            ],
        )?;
        if affected > 0 {
            self.notify(Change::Config {
                user_id: config.user_id,
            });
        }
        Ok(affected > 0)
    }
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<Config> {
    Ok(Config {
        id: row.get(0)?,
        user_id: row.get(1)?,
        robot_name: row.get(2)?,
        model: row.get(3)?,
        max_tokens: row.get(4)?,
        temperature: row.get(5)?,
        top_p: row.get(6)?,
        frequency_penalty: row.get(7)?,
        presence_penalty: row.get(8)?,
        system_prompt: row.get(9)?,
        backend_url: row.get(10)?,
    })
}
