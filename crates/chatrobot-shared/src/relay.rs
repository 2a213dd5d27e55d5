//! JSON bodies understood by the self-hosted relay.
//!
//! The relay speaks snake_case JSON with an `ok` flag on every response.

use serde::{Deserialize, Serialize};

/// `POST /messages` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub name: String,
    pub time: i64,
    pub content: String,
    pub user_id: i64,
    pub is_self: bool,
    pub session_id: i64,
    pub image_uri: Option<String>,
    pub status: String,
}

/// A message row as returned by `GET /messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: i64,
    pub name: String,
    pub time: i64,
    pub content: String,
    pub user_id: i64,
    pub is_self: bool,
    pub session_id: i64,
    pub image_uri: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: Vec<RemoteMessage>,
}

/// `POST /conversations` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub user_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationCreated {
    pub ok: bool,
    #[serde(default)]
    pub id: i64,
}

/// `POST /uploadImage` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadImageRequest {
    pub base64: String,
}

/// `path` is relative to the relay base URL, e.g. `/static/<file>.png`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub ok: bool,
    #[serde(default)]
    pub path: String,
}

/// Bare acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}
