//! Relay configuration loaded from environment variables.
//!
//! Every setting has a default so the relay starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chatrobot_shared::constants::{DEFAULT_RELAY_PORT, MAX_RELAY_BODY};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server.
    /// Env: `HTTP_ADDR`, or `PORT` to change only the port.
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// SQLite file holding mirrored messages, users and conversations.
    /// Env: `RELAY_DB_PATH`
    /// Default: `./relay.db`
    pub db_path: PathBuf,

    /// Directory uploaded images are written to and served from `/static`.
    /// Env: `UPLOAD_DIR`
    /// Default: `./server_uploads`
    pub upload_dir: PathBuf,

    /// Largest accepted request body, in bytes.
    /// Env: `MAX_BODY_BYTES`
    /// Default: 10 MiB
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_RELAY_PORT).into(),
            db_path: PathBuf::from("./relay.db"),
            upload_dir: PathBuf::from("./server_uploads"),
            max_body_bytes: MAX_RELAY_BODY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        } else if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.http_addr.set_port(port),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        if let Some(path) = lookup("RELAY_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(val) = lookup("MAX_BODY_BYTES") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_body_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BODY_BYTES, using default"),
            }
        }

        config
    }
}
