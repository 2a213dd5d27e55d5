use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::BASE64_IMAGE_PREFIX;
use crate::error::SharedError;

/// Delivery state of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Loading,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Loading => "loading",
            MessageStatus::Failed => "failed",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "loading" => Ok(MessageStatus::Loading),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(SharedError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Role of a stored message, decided by who wrote it.
    pub fn for_author(is_self: bool) -> Self {
        if is_self {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// Where the bytes of an attached or generated image live.
///
/// Stored on a message as a single string:
/// - `http…`            -> [`ImageRef::Remote`]
/// - `base64:<payload>` -> [`ImageRef::Inline`]
/// - anything else      -> [`ImageRef::Local`], an opaque on-device handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Remote(String),
    Inline(String),
    Local(String),
}

impl ImageRef {
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with("http") {
            ImageRef::Remote(uri.to_string())
        } else if let Some(payload) = uri.strip_prefix(BASE64_IMAGE_PREFIX) {
            ImageRef::Inline(payload.to_string())
        } else {
            ImageRef::Local(uri.to_string())
        }
    }

    /// Whether the gateway can consume this reference without a local read.
    pub fn is_shareable(&self) -> bool {
        !matches!(self, ImageRef::Local(_))
    }

    pub fn to_uri(&self) -> String {
        match self {
            ImageRef::Remote(url) => url.clone(),
            ImageRef::Inline(payload) => format!("{BASE64_IMAGE_PREFIX}{payload}"),
            ImageRef::Local(handle) => handle.clone(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Remote(url) => write!(f, "{url}"),
            ImageRef::Inline(payload) => write!(f, "{BASE64_IMAGE_PREFIX}<{} bytes>", payload.len()),
            ImageRef::Local(handle) => write!(f, "{handle}"),
        }
    }
}
