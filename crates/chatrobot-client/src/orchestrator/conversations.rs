use chatrobot_shared::constants::DEFAULT_CONVERSATION_TITLE;
use chatrobot_store::{Conversation, LiveQuery, Message, StoreError};

use super::{Orchestrator, Result};
use crate::error::ClientError;

const PREVIEW_USER_CHARS: usize = 20;
const PREVIEW_ASSISTANT_CHARS: usize = 40;
const PREVIEW_SEPARATOR: &str = "  ·  ";

impl Orchestrator {
    /// Return the active session, adopting the latest conversation or
    /// creating a fresh one when there is none.
    pub async fn ensure_session(&self) -> Result<i64> {
        if let Some(id) = self.active_session() {
            return Ok(id);
        }

        // lookup and create run under one lock
        let (conversation, created) = self.with_db(|db| {
            match db.latest_conversation(self.user_id)? {
                Some(conversation) => Ok((conversation, false)),
                None => db
                    .create_conversation(self.user_id, DEFAULT_CONVERSATION_TITLE, Self::now())
                    .map(|conversation| (conversation, true)),
            }
        })?;
        if created {
            tracing::info!(session = conversation.id, "created conversation");
            self.mirror_conversation(&conversation.title);
        } else {
            tracing::info!(session = conversation.id, "resuming latest conversation");
        }
        self.adopt_session(Some(conversation.id));
        Ok(conversation.id)
    }

    /// Create a conversation, mirror it and make it active.
    pub async fn start_new_session(&self, title: &str) -> Result<Conversation> {
        let conversation = self.create_conversation(title)?;
        self.adopt_session(Some(conversation.id));
        Ok(conversation)
    }

    pub fn open_conversation(&self, id: i64) -> Result<Conversation> {
        let conversation = self.owned_conversation(id)?;
        tracing::info!(session = id, "opened conversation");
        self.adopt_session(Some(id));
        Ok(conversation)
    }

    pub fn rename_conversation(&self, id: i64, title: &str) -> Result<bool> {
        self.owned_conversation(id)?;
        self.with_db(|db| db.update_conversation_title(id, title))
    }

    /// Delete a conversation and its messages.  Deleting the active one
    /// clears the pointer; the next send adopts another session.
    pub fn delete_conversation(&self, id: i64) -> Result<bool> {
        self.owned_conversation(id)?;
        let deleted = self.with_db(|db| db.delete_conversation(id))?;
        if deleted && self.active_session() == Some(id) {
            self.adopt_session(None);
        }
        Ok(deleted)
    }

    /// `id` if it exists and belongs to this user.
    fn owned_conversation(&self, id: i64) -> Result<Conversation> {
        match self.with_db(|db| db.get_conversation(id)) {
            Ok(c) if c.user_id == self.user_id => Ok(c),
            Ok(_) | Err(ClientError::Store(StoreError::NotFound)) => {
                Err(ClientError::UnknownConversation(id))
            }
            Err(e) => Err(e),
        }
    }

    /// The user's conversations, newest first.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.with_db(|db| db.list_conversations(self.user_id))
    }

    pub fn conversations_live(&self) -> Result<LiveQuery<Vec<Conversation>>> {
        Ok(LiveQuery::user_conversations(self.db.clone(), self.user_id)?)
    }

    /// One-line summary for a history list: first user line, last
    /// assistant line.
    pub fn conversation_preview(&self, id: i64) -> Result<String> {
        let messages = self.with_db(|db| db.messages_for_session(id))?;
        Ok(preview_line(&messages))
    }

    /// The last `count` messages of a conversation, oldest first.
    pub fn preview_messages(&self, id: i64, count: usize) -> Result<Vec<Message>> {
        self.with_db(|db| db.recent_messages(id, count))
    }

    fn create_conversation(&self, title: &str) -> Result<Conversation> {
        let conversation =
            self.with_db(|db| db.create_conversation(self.user_id, title, Self::now()))?;
        tracing::info!(session = conversation.id, %title, "created conversation");
        self.mirror_conversation(title);
        Ok(conversation)
    }
}

fn preview_line(messages: &[Message]) -> String {
    let first_user = messages
        .iter()
        .find(|m| m.is_self)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let last_assistant = messages
        .iter()
        .rev()
        .find(|m| !m.is_self)
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    [
        truncate(first_user, PREVIEW_USER_CHARS),
        truncate(last_assistant, PREVIEW_ASSISTANT_CHARS),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(PREVIEW_SEPARATOR)
}

/// Cut to `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}
