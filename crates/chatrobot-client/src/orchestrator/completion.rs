use chatrobot_shared::constants::{HISTORY_WINDOW, NO_RETRY_CONTENT};
use chatrobot_shared::protocol::{ChatMessage, ChatRequest, ChatResponse, Sampling, VisionContent, VisionRequest};
use chatrobot_shared::{ImageRef, MessageStatus, Role};
use chatrobot_store::{Config, Message};

use super::{Orchestrator, Result, Route};
use crate::error::GatewayError;

impl Orchestrator {
    /// Persist `text` as the user's message and answer it.
    ///
    /// Gateway failures end up as a `failed` assistant message, not as an
    /// error; only local store failures are returned.
    pub async fn send_user_message(&self, text: &str) -> Result<()> {
        // settings may have been edited through the store since the last turn
        let config = self.ensure_config()?;
        let session_id = self.ensure_session().await?;
        let user_message = self.record(session_id, true, text, None, MessageStatus::Sent)?;
        self.mirror_message(&user_message);

        let _loading = self.start_loading();

        let latest_image = self.with_db(|db| db.latest_image_uri(session_id))?;
        match Route::for_message(text, latest_image.as_deref()) {
            Route::ImageGeneration => self.generate_image(session_id, text).await,
            Route::Vision(image) => {
                tracing::debug!(session = session_id, %image, "routing to vision");
                let request = VisionRequest::single_turn(vision_part(&image), text);
                let outcome = self.gateway.vision_completion(&request).await;
                self.finish_reply(session_id, outcome)
            }
            Route::Text => {
                let history = self.with_db(|db| db.recent_messages(session_id, HISTORY_WINDOW))?;
                let request = chat_request(&config, &history, text);
                let outcome = self.gateway.chat_completion(&request).await;
                self.finish_reply(session_id, outcome)
            }
        }
    }

    /// Resend the newest user message of the active session on behalf of the
    /// failed assistant message `message_id`.
    pub async fn retry_assistant_message(&self, message_id: i64) -> Result<()> {
        self.with_db(|db| db.update_message_status(message_id, MessageStatus::Loading))?;

        let session_id = self.ensure_session().await?;
        let last_user = self.with_db(|db| db.last_self_message(session_id))?;
        match last_user {
            Some(message) => {
                tracing::info!(session = session_id, target = message_id, "retrying");
                self.send_user_message(&message.content).await
            }
            None => {
                self.with_db(|db| {
                    db.update_message_content_and_status(
                        message_id,
                        NO_RETRY_CONTENT,
                        MessageStatus::Failed,
                    )
                })?;
                Ok(())
            }
        }
    }

    /// Persist the outcome of a text or vision turn into `session_id`.
    pub(super) fn finish_reply(
        &self,
        session_id: i64,
        outcome: std::result::Result<ChatResponse, GatewayError>,
    ) -> Result<()> {
        match outcome {
            Ok(response) => {
                let reply = response.first_text().unwrap_or_default().trim();
                let message = self.record(session_id, false, reply, None, MessageStatus::Sent)?;
                self.mirror_message(&message);
                self.regenerate_title(session_id);
            }
            Err(e) => {
                tracing::warn!(session = session_id, error = %e, "completion failed");
                let message = self.record(
                    session_id,
                    false,
                    &e.user_message(),
                    None,
                    MessageStatus::Failed,
                )?;
                self.mirror_message(&message);
            }
        }
        Ok(())
    }
}

/// `[system, ...history, user]` with the config's sampling parameters.
pub(super) fn chat_request(config: &Config, history: &[Message], text: &str) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, config.system_prompt.as_str()));
    messages.extend(
        history
            .iter()
            .map(|m| ChatMessage::new(Role::for_author(m.is_self), m.content.as_str())),
    );
    messages.push(ChatMessage::new(Role::User, text));

    ChatRequest {
        model: config.model.clone(),
        prompt: String::new(),
        messages,
        sampling: Sampling {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
        },
    }
}

/// The image half of a vision turn.  Callers resolve local handles first.
pub(super) fn vision_part(image: &ImageRef) -> VisionContent {
    match image {
        ImageRef::Remote(url) => VisionContent::image_url(url.as_str()),
        ImageRef::Inline(payload) | ImageRef::Local(payload) => {
            VisionContent::image_base64(payload.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use chatrobot_shared::MessageStatus;

    use super::*;

    fn message(is_self: bool, content: &str) -> Message {
        Message {
            id: 1,
            name: "n".into(),
            time: 1,
            content: content.into(),
            user_id: 1,
            is_self,
            session_id: 1,
            image_uri: None,
            status: MessageStatus::Sent,
        }
    }

    #[test]
    fn request_wraps_history_with_system_and_user() {
        let mut config = Config::defaults_for(1);
        config.system_prompt = "sys".into();
        config.temperature = 0.9;
        let history = [message(true, "a"), message(false, "b")];

        let req = chat_request(&config, &history, "c");
        let roles: Vec<_> = req.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(req.messages[0].content, "sys");
        assert_eq!(req.messages[3].content, "c");
        assert_eq!(req.prompt, "");
        assert_eq!(req.model, config.model);
        assert_eq!(req.sampling.temperature, 0.9);
        assert_eq!(req.sampling.max_tokens, config.max_tokens);
    }

    #[test]
    fn vision_part_by_reference_kind() {
        let remote = vision_part(&ImageRef::Remote("https://x/a.png".into()));
        assert_eq!(remote.kind, "image_url");
        assert_eq!(remote.image_url.unwrap().url, "https://x/a.png");

        let inline = vision_part(&ImageRef::Inline("AAAA".into()));
        assert_eq!(inline.kind, "input_image");
        assert_eq!(inline.image_base64.as_deref(), Some("AAAA"));
    }
}
