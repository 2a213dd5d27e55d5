//! JSON bodies exchanged with the hosted AI gateway.
//!
//! Text and vision turns share `POST /chat/completions` and its response
//! shape; image generation uses `POST /images/generations`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    IMAGE_MODEL, IMAGE_RESPONSE_FORMAT, IMAGE_SIZE, TITLE_MAX_TOKENS, TITLE_TEMPERATURE,
    VISION_MODEL,
};
use crate::types::Role;

// ---------------------------------------------------------------------------
// Text completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling parameters applied to a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature: f64,
    pub max_tokens: i64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

/// `POST /chat/completions` body for text turns.
///
/// `prompt` stays empty whenever `messages` carries the conversation; it is
/// only filled for one-shot prompts such as title generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub sampling: Sampling,
}

impl ChatRequest {
    /// One-shot title request: low temperature, short output, bare prompt.
    pub fn title(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            messages: Vec::new(),
            sampling: Sampling {
                temperature: TITLE_TEMPERATURE,
                max_tokens: TITLE_MAX_TOKENS,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A completion choice. Chat-style providers fill `message`, legacy
/// completion endpoints fill `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// Text of the first choice, preferring `message.content` over `text`.
    pub fn first_text(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .or(choice.text.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Vision completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionImageUrl {
    pub url: String,
}

/// One part of a multi-part vision message. Exactly one of `image_url`,
/// `image_base64` and `text` is set, matching `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<VisionImageUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl VisionContent {
    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            kind: "image_url".to_string(),
            image_url: Some(VisionImageUrl { url: url.into() }),
            text: None,
            image_base64: None,
        }
    }

    pub fn image_base64(payload: impl Into<String>) -> Self {
        Self {
            kind: "input_image".to_string(),
            image_url: None,
            text: None,
            image_base64: Some(payload.into()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            image_url: None,
            text: Some(text.into()),
            image_base64: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionMessage {
    pub role: Role,
    pub content: Vec<VisionContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionRequest {
    pub model: String,
    pub messages: Vec<VisionMessage>,
}

impl VisionRequest {
    /// Single user turn carrying one image part followed by the prompt.
    pub fn single_turn(image: VisionContent, prompt: &str) -> Self {
        Self {
            model: VISION_MODEL.to_string(),
            messages: vec![VisionMessage {
                role: Role::User,
                content: vec![image, VisionContent::text(prompt)],
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_image_generation: Option<String>,
    pub response_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub stream: bool,
    pub watermark: bool,
}

impl ImageGenRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            model: IMAGE_MODEL.to_string(),
            prompt: prompt.to_string(),
            sequential_image_generation: Some("disabled".to_string()),
            response_format: IMAGE_RESPONSE_FORMAT.to_string(),
            size: Some(IMAGE_SIZE.to_string()),
            stream: false,
            watermark: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenResponse {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_flattens_sampling() {
        let req = ChatRequest {
            model: "m".into(),
            prompt: String::new(),
            messages: vec![ChatMessage::new(Role::System, "sys")],
            sampling: Sampling {
                temperature: 0.5,
                max_tokens: 60,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.6,
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["max_tokens"], 60);
        assert_eq!(value["presence_penalty"], 0.6);
        assert_eq!(value["prompt"], "");
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn first_text_prefers_message_content() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "hi" }, "text": "legacy" }]
        }))
        .unwrap();
        assert_eq!(resp.first_text(), Some("hi"));

        let legacy: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "text": "legacy" }] })).unwrap();
        assert_eq!(legacy.first_text(), Some("legacy"));

        let empty: ChatResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[test]
    fn vision_parts_omit_unused_fields() {
        let req = VisionRequest::single_turn(VisionContent::image_base64("QUJD"), "what is it");
        let value = serde_json::to_value(&req).unwrap();
        let parts = &value["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "input_image");
        assert_eq!(parts[0]["image_base64"], "QUJD");
        assert!(parts[0].get("image_url").is_none());
        assert_eq!(parts[1], json!({ "type": "text", "text": "what is it" }));
        assert_eq!(value["model"], VISION_MODEL);
    }

    #[test]
    fn image_request_uses_fixed_parameters() {
        let value = serde_json::to_value(ImageGenRequest::new("a cat")).unwrap();
        assert_eq!(value["model"], IMAGE_MODEL);
        assert_eq!(value["response_format"], "b64_json");
        assert_eq!(value["size"], "2K");
        assert_eq!(value["sequential_image_generation"], "disabled");
        assert_eq!(value["stream"], false);
        assert_eq!(value["watermark"], true);
    }
}
