//! Client configuration loaded from environment variables.
//!
//! Everything has a default so the terminal driver starts with only an API
//! key exported.

use std::path::PathBuf;
use std::time::Duration;

use chatrobot_shared::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_GATEWAY_URL, DEFAULT_RELAY_URL, REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token for the AI gateway.
    /// Env: `CHATROBOT_API_KEY`
    pub api_key: String,

    /// Gateway base URL, no trailing slash.
    /// Env: `CHATROBOT_GATEWAY_URL`
    pub gateway_url: String,

    /// Relay base URL used until the user's config names another one.
    /// Env: `CHATROBOT_RELAY_URL`
    pub relay_url: String,

    /// Explicit database file.  `None` means the platform data directory.
    /// Env: `CHATROBOT_DB_PATH`
    pub db_path: Option<PathBuf>,

    /// Env: `CHATROBOT_CONNECT_TIMEOUT_SECS`
    pub connect_timeout: Duration,

    /// Budget for a whole request, connect included.
    /// Env: `CHATROBOT_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            db_path: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("CHATROBOT_API_KEY") {
            config.api_key = key.trim().to_string();
        }

        if let Some(url) = lookup("CHATROBOT_GATEWAY_URL") {
            if !url.trim().is_empty() {
                config.gateway_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(url) = lookup("CHATROBOT_RELAY_URL") {
            if !url.trim().is_empty() {
                config.relay_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(path) = lookup("CHATROBOT_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(secs) = parse_secs(&lookup, "CHATROBOT_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = secs;
        }

        if let Some(secs) = parse_secs(&lookup, "CHATROBOT_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs;
        }

        config
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)?;
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(key, value = %value, "Invalid timeout, using default");
            None
        }
    }
}
