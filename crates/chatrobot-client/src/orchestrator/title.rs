use std::sync::Arc;

use chatrobot_shared::constants::{
    TITLE_ASSISTANT_PREFIX, TITLE_PROMPT, TITLE_USER_PREFIX, TITLE_WINDOW,
};
use chatrobot_shared::protocol::ChatRequest;
use chatrobot_store::{lock, Message, SharedDatabase};

use super::Orchestrator;
use crate::gateway::AiGateway;

impl Orchestrator {
    /// Ask the gateway for a short title in the background.  Any failure
    /// leaves the current title in place.
    pub(super) fn regenerate_title(&self, session_id: i64) {
        let db = self.db.clone();
        let gateway = self.gateway.clone();
        let model = self.config().model;
        self.spawn(async move {
            match fetch_title(&db, gateway, session_id, &model).await {
                Some(title) => {
                    let renamed = lock(&db)
                        .and_then(|db| db.update_conversation_title(session_id, &title));
                    match renamed {
                        Ok(true) => tracing::debug!(session = session_id, %title, "title updated"),
                        Ok(false) => tracing::debug!(session = session_id, "conversation gone"),
                        Err(e) => tracing::warn!(session = session_id, error = %e, "title not saved"),
                    }
                }
                None => tracing::debug!(session = session_id, "title left unchanged"),
            }
        });
    }
}

async fn fetch_title(
    db: &SharedDatabase,
    gateway: Arc<dyn AiGateway>,
    session_id: i64,
    model: &str,
) -> Option<String> {
    let recent = match lock(db).and_then(|db| db.recent_messages(session_id, TITLE_WINDOW)) {
        Ok(recent) => recent,
        Err(e) => {
            tracing::warn!(session = session_id, error = %e, "cannot read title context");
            return None;
        }
    };

    let request = ChatRequest::title(model, title_prompt(&recent));
    match gateway.chat_completion(&request).await {
        Ok(response) => {
            let title = response.first_text()?.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        Err(e) => {
            tracing::debug!(session = session_id, error = %e, "title request failed");
            None
        }
    }
}

fn title_prompt(recent: &[Message]) -> String {
    let lines: Vec<String> = recent
        .iter()
        .map(|m| {
            let prefix = if m.is_self {
                TITLE_USER_PREFIX
            } else {
                TITLE_ASSISTANT_PREFIX
            };
            format!("{prefix}{}", m.content)
        })
        .collect();
    format!("{TITLE_PROMPT}{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use chatrobot_shared::MessageStatus;

    use super::*;

    #[test]
    fn prompt_lists_speakers_in_order() {
        let msg = |is_self: bool, content: &str| Message {
            id: 0,
            name: String::new(),
            time: 0,
            content: content.into(),
            user_id: 1,
            is_self,
            session_id: 1,
            image_uri: None,
            status: MessageStatus::Sent,
        };
        let prompt = title_prompt(&[msg(true, "你好"), msg(false, "你好！有什么可以帮你")]);
        assert_eq!(
            prompt,
            format!("{TITLE_PROMPT}用户:你好\nAI:你好！有什么可以帮你")
        );
    }
}
