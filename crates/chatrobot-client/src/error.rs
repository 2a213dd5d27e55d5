use chatrobot_shared::constants::{TRANSPORT_FAILURE_TEXT, UPSTREAM_FAILURE_TEXT};
use chatrobot_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the orchestrator to its caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(i64),
}

/// A failed call to the AI gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, timeout.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Non-2xx answer.
    #[error("Gateway rejected request ({status})")]
    Upstream { status: u16, body: Option<String> },

    /// 2xx answer whose body did not parse.
    #[error("Malformed gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Text persisted on the failed assistant message.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Upstream { body, .. } => match body.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => UPSTREAM_FAILURE_TEXT.to_string(),
            },
            GatewayError::Transport(_) | GatewayError::Decode(_) => {
                TRANSPORT_FAILURE_TEXT.to_string()
            }
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// A failed call to the relay.  Always swallowed by the orchestrator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay answered {0}")]
    Rejected(u16),

    #[error("Relay answered ok=false")]
    NotOk,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_body_is_shown_verbatim() {
        let err = GatewayError::Upstream {
            status: 401,
            body: Some("{\"error\":\"bad key\"}".into()),
        };
        assert_eq!(err.user_message(), "{\"error\":\"bad key\"}");
    }

    #[test]
    fn empty_upstream_body_falls_back() {
        for body in [None, Some(String::new()), Some("  ".into())] {
            let err = GatewayError::Upstream { status: 500, body };
            assert_eq!(err.user_message(), UPSTREAM_FAILURE_TEXT);
        }
    }

    #[test]
    fn transport_and_decode_share_text() {
        assert_eq!(
            GatewayError::Transport("timeout".into()).user_message(),
            TRANSPORT_FAILURE_TEXT
        );
        assert_eq!(
            GatewayError::Decode("eof".into()).user_message(),
            TRANSPORT_FAILURE_TEXT
        );
    }
}
