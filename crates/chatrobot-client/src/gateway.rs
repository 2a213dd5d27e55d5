//! Typed bindings to the hosted AI gateway.
//!
//! Text and vision turns go to `POST /chat/completions`, image generation to
//! `POST /images/generations`.  Every request carries the bearer token.

use async_trait::async_trait;
use chatrobot_shared::protocol::{
    ChatRequest, ChatResponse, ImageGenRequest, ImageGenResponse, VisionRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::GatewayError;

#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError>;

    async fn vision_completion(
        &self,
        request: &VisionRequest,
    ) -> Result<ChatResponse, GatewayError>;

    async fn generate_image(
        &self,
        request: &ImageGenRequest,
    ) -> Result<ImageGenResponse, GatewayError>;
}

/// [`AiGateway`] over HTTPS.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok();
            tracing::warn!(%url, status = status.as_u16(), "Gateway rejected request");
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<R>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AiGateway for HttpGateway {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        tracing::debug!(model = %request.model, history = request.messages.len(), "chat completion");
        self.post_json("/chat/completions", request).await
    }

    async fn vision_completion(
        &self,
        request: &VisionRequest,
    ) -> Result<ChatResponse, GatewayError> {
        tracing::debug!(model = %request.model, "vision completion");
        self.post_json("/chat/completions", request).await
    }

    async fn generate_image(
        &self,
        request: &ImageGenRequest,
    ) -> Result<ImageGenResponse, GatewayError> {
        tracing::debug!(model = %request.model, "image generation");
        self.post_json("/images/generations", request).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatrobot_shared::protocol::{ChatMessage, Sampling, VisionContent};
    use chatrobot_shared::Role;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn gateway_for(url: &str) -> HttpGateway {
        let config = ClientConfig {
            api_key: "sk-test".into(),
            gateway_url: url.to_string(),
            request_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        };
        HttpGateway::new(&config).unwrap()
    }

    fn chat_request() -> ChatRequest {
        ChatRequest {
            model: "m".into(),
            prompt: String::new(),
            messages: vec![
                ChatMessage::new(Role::System, "sys"),
                ChatMessage::new(Role::User, "你好"),
            ],
            sampling: Sampling {
                temperature: 0.5,
                max_tokens: 60,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.6,
            },
        }
    }

    #[tokio::test]
    async fn chat_completion_sends_bearer_and_flat_sampling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "m",
                "prompt": "",
                "max_tokens": 60,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "你好"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "  hi  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = gateway_for(&server.uri())
            .chat_completion(&chat_request())
            .await
            .unwrap();
        assert_eq!(resp.first_text(), Some("  hi  "));
    }

    #[tokio::test]
    async fn non_success_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = gateway_for(&server.uri())
            .chat_completion(&chat_request())
            .await
            .unwrap_err();
        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body.as_deref(), Some("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway_for(&server.uri())
            .chat_completion(&chat_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_upstream_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = gateway_for(&server.uri())
            .chat_completion(&chat_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_failure() {
        let err = gateway_for("http://127.0.0.1:1")
            .chat_completion(&chat_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn vision_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "image_url", "image_url": {"url": "https://r/static/a.png"}},
                        {"type": "text", "text": "这是什么"}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "一只猫"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = VisionRequest::single_turn(
            VisionContent::image_url("https://r/static/a.png"),
            "这是什么",
        );
        let resp = gateway_for(&server.uri()).vision_completion(&req).await.unwrap();
        assert_eq!(resp.first_text(), Some("一只猫"));
    }

    #[tokio::test]
    async fn image_generation_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(body_partial_json(json!({
                "prompt": "画一张猫",
                "response_format": "b64_json",
                "size": "2K",
                "stream": false,
                "watermark": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1,
                "data": [{"b64_json": "AAAA"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = gateway_for(&server.uri())
            .generate_image(&ImageGenRequest::new("画一张猫"))
            .await
            .unwrap();
        assert_eq!(resp.data[0].b64_json.as_deref(), Some("AAAA"));
    }
}
