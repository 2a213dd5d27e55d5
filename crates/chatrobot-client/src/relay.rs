//! Client for the self-hosted relay.
//!
//! The base URL is passed per call because it can change at runtime when the
//! user edits their config.

use async_trait::async_trait;
use chatrobot_shared::relay::{
    Ack, ConversationCreated, ConversationPayload, MessagePayload, UploadImageRequest,
    UploadImageResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::RelayError;

#[async_trait]
pub trait Relay: Send + Sync {
    async fn post_message(&self, base_url: &str, message: &MessagePayload)
        -> Result<(), RelayError>;

    /// Returns the relay-side conversation id.
    async fn post_conversation(
        &self,
        base_url: &str,
        conversation: &ConversationPayload,
    ) -> Result<i64, RelayError>;

    /// Returns the stored file's path relative to `base_url`.
    async fn upload_image(&self, base_url: &str, base64: &str) -> Result<String, RelayError>;
}

#[derive(Clone)]
pub struct HttpRelay {
    http: reqwest::Client,
}

impl HttpRelay {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http })
    }

    async fn post_json<B, R>(&self, base_url: &str, path: &str, body: &B) -> Result<R, RelayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        let resp = self.http.post(&url).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(RelayError::Rejected(resp.status().as_u16()));
        }
        Ok(resp.json::<R>().await?)
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn post_message(
        &self,
        base_url: &str,
        message: &MessagePayload,
    ) -> Result<(), RelayError> {
        let ack: Ack = self.post_json(base_url, "/messages", message).await?;
        if !ack.ok {
            return Err(RelayError::NotOk);
        }
        Ok(())
    }

    async fn post_conversation(
        &self,
        base_url: &str,
        conversation: &ConversationPayload,
    ) -> Result<i64, RelayError> {
        let created: ConversationCreated =
            self.post_json(base_url, "/conversations", conversation).await?;
        if !created.ok {
            return Err(RelayError::NotOk);
        }
        Ok(created.id)
    }

    async fn upload_image(&self, base_url: &str, base64: &str) -> Result<String, RelayError> {
        let body = UploadImageRequest {
            base64: base64.to_string(),
        };
        let uploaded: UploadImageResponse =
            self.post_json(base_url, "/uploadImage", &body).await?;
        if !uploaded.ok || uploaded.path.is_empty() {
            return Err(RelayError::NotOk);
        }
        Ok(uploaded.path)
    }
}
