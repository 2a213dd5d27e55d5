//! # chatrobot-relay
//!
//! Self-hosted mirror for the chat client.
//!
//! This binary provides:
//! - **Message mirroring**: clients post every persisted message and can
//!   list a session back in time order
//! - **User and conversation rows** created on the client's behalf
//! - **Image uploads** decoded from base64 and served from `/static`
//!
//! Everything is stored in one SQLite file plus an upload directory.

mod api;
mod config;
mod db;
mod error;
mod image_store;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::db::RelayDb;
use crate::image_store::ImageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatrobot_relay=debug")),
        )
        .init();

    info!("Starting chatrobot relay v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize storage
    // -----------------------------------------------------------------------
    let db = Arc::new(RelayDb::open(&config.db_path)?);

    // Upload directory (created if missing)
    let images = Arc::new(ImageStore::new(config.upload_dir.clone()).await?);

    let http_addr = config.http_addr;
    let app_state = AppState {
        db,
        images,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP server until it fails or Ctrl+C arrives
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
