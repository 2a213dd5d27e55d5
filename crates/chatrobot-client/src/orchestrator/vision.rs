use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chatrobot_shared::constants::IMAGE_READ_FAILURE_TEXT;
use chatrobot_shared::protocol::VisionRequest;
use chatrobot_shared::{ImageRef, MessageStatus};

use super::completion::vision_part;
use super::{Orchestrator, Result};

impl Orchestrator {
    /// Ask about an attached image.
    ///
    /// The prompt is stored as the user's message carrying `image_uri`.  A
    /// local handle is read and uploaded first, and the stored reference is
    /// rewritten to the uploaded URL (or inline base64 when the upload
    /// fails) so later text turns in this conversation route to vision.
    pub async fn send_vision_message(&self, image_uri: &str, prompt: &str) -> Result<()> {
        self.ensure_config()?;
        let session_id = self.ensure_session().await?;
        let mut user_message = self.record(
            session_id,
            true,
            prompt,
            Some(image_uri.to_string()),
            MessageStatus::Sent,
        )?;

        let _loading = self.start_loading();

        let image = match ImageRef::parse(image_uri) {
            ImageRef::Local(handle) => match read_local(&handle).await {
                Ok(bytes) => self.share_image(&STANDARD.encode(bytes)).await,
                Err(e) => {
                    tracing::warn!(session = session_id, handle = %handle, error = %e, "cannot read image");
                    self.mirror_message(&user_message);
                    let failure = self.record(
                        session_id,
                        false,
                        &format!("{IMAGE_READ_FAILURE_TEXT}: {e}"),
                        None,
                        MessageStatus::Failed,
                    )?;
                    self.mirror_message(&failure);
                    return Ok(());
                }
            },
            shareable => shareable,
        };

        let resolved = image.to_uri();
        if resolved != image_uri {
            self.with_db(|db| db.update_message_image(user_message.id, Some(resolved.as_str())))?;
            user_message.image_uri = Some(resolved);
        }
        self.mirror_message(&user_message);

        let request = VisionRequest::single_turn(vision_part(&image), prompt);
        let outcome = self.gateway.vision_completion(&request).await;
        self.finish_reply(session_id, outcome)
    }

    /// Upload a base64 image to the relay.  Falls back to the inline form.
    pub(super) async fn share_image(&self, base64: &str) -> ImageRef {
        match self.upload(base64).await {
            Some(url) => ImageRef::Remote(url),
            None => ImageRef::Inline(base64.to_string()),
        }
    }

    /// Absolute URL of the uploaded image, or `None` on any relay failure.
    pub(super) async fn upload(&self, base64: &str) -> Option<String> {
        let base_url = self.relay_url();
        match self.relay.upload_image(&base_url, base64).await {
            Ok(path) => Some(format!("{base_url}{path}")),
            Err(e) => {
                tracing::debug!(error = %e, "image upload failed");
                None
            }
        }
    }
}

/// Read an on-device image.  `file://` URIs and bare paths are accepted.
async fn read_local(handle: &str) -> std::io::Result<Vec<u8>> {
    let path = handle.strip_prefix("file://").unwrap_or(handle);
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "empty image file",
        ));
    }
    Ok(bytes)
}
