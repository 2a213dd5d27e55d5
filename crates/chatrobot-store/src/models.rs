//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a presentation layer.

use chatrobot_shared::constants::{
    DEFAULT_FREQUENCY_PENALTY, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_PRESENCE_PENALTY,
    DEFAULT_ROBOT_NAME, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};
use chatrobot_shared::MessageStatus;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The person using this device.  Created on first launch, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub avatar_uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A titled thread of messages belonging to one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    /// Unix seconds.
    pub created_time: i64,
    pub user_id: i64,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message, written by the user (`is_self`) or the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    /// Display name of the author at the time of writing.
    pub name: String,
    /// Unix seconds.
    pub time: i64,
    pub content: String,
    pub user_id: i64,
    pub is_self: bool,
    /// Conversation id.
    pub session_id: i64,
    pub image_uri: Option<String>,
    pub status: MessageStatus,
}

/// A message that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub name: String,
    pub time: i64,
    pub content: String,
    pub user_id: i64,
    pub is_self: bool,
    pub session_id: i64,
    pub image_uri: Option<String>,
    pub status: MessageStatus,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Per-user assistant settings, read before every completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub id: i64,
    pub user_id: i64,
    pub robot_name: String,
    pub model: String,
    pub max_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub system_prompt: String,
    /// Custom relay base URL; blank means "use the built-in one".
    pub backend_url: String,
}

impl Config {
    /// Defaults for a user who has never opened the settings screen.
    /// `id` is 0 until the row is inserted.
    pub fn defaults_for(user_id: i64) -> Self {
        Self {
            id: 0,
            user_id,
            robot_name: DEFAULT_ROBOT_NAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            backend_url: String::new(),
        }
    }

    /// The custom relay URL, if one is set.
    pub fn custom_backend_url(&self) -> Option<&str> {
        let url = self.backend_url.trim();
        (!url.is_empty()).then_some(url)
    }
}
