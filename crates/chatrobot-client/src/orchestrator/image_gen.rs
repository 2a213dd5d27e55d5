use chatrobot_shared::constants::{
    BASE64_IMAGE_PREFIX, GENERATED_IMAGE_PLACEHOLDER, IMAGE_GEN_FAILURE_TEXT,
};
use chatrobot_shared::protocol::{ImageData, ImageGenRequest};
use chatrobot_shared::MessageStatus;

use super::{Orchestrator, Result};
use crate::error::GatewayError;

impl Orchestrator {
    pub(super) async fn generate_image(&self, session_id: i64, prompt: &str) -> Result<()> {
        let outcome = self
            .gateway
            .generate_image(&ImageGenRequest::new(prompt))
            .await;

        let (image_uri, content, status) = match outcome {
            Ok(response) => {
                let image_uri = match response.data.into_iter().next() {
                    Some(image) => self.resolve_generated(image).await,
                    None => None,
                };
                (
                    image_uri,
                    GENERATED_IMAGE_PLACEHOLDER.to_string(),
                    MessageStatus::Sent,
                )
            }
            Err(e) => {
                tracing::warn!(session = session_id, error = %e, "image generation failed");
                (None, failure_text(&e), MessageStatus::Failed)
            }
        };

        let message = self.record(session_id, false, &content, image_uri, status)?;
        self.mirror_message(&message);
        Ok(())
    }

    /// Prefer an uploaded copy, then the provider's URL, then inline base64.
    /// A URL-only result is used as-is with no upload.
    async fn resolve_generated(&self, image: ImageData) -> Option<String> {
        match (image.b64_json, image.url) {
            (Some(b64), url) => match self.upload(&b64).await {
                Some(uploaded) => Some(uploaded),
                None => Some(url.unwrap_or_else(|| format!("{BASE64_IMAGE_PREFIX}{b64}"))),
            },
            (None, url) => url,
        }
    }
}

fn failure_text(e: &GatewayError) -> String {
    match e {
        GatewayError::Upstream { status, .. } => format!("{IMAGE_GEN_FAILURE_TEXT}({status})"),
        other => format!("{IMAGE_GEN_FAILURE_TEXT}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_carries_status_or_error() {
        let upstream = GatewayError::Upstream {
            status: 500,
            body: Some("oops".into()),
        };
        assert_eq!(failure_text(&upstream), "图片生成失败(500)");

        let transport = failure_text(&GatewayError::Transport("timed out".into()));
        assert!(transport.starts_with("图片生成失败: "));
        assert!(transport.contains("timed out"));
    }
}
