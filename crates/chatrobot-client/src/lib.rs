//! # chatrobot-client
//!
//! Client-side core of the chat app: typed bindings to the hosted AI
//! gateway, a best-effort mirror to the self-hosted relay, and the
//! [`Orchestrator`] that keeps local history, mirrored copies and AI replies
//! consistent.

pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod relay;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, GatewayError, RelayError};
pub use gateway::{AiGateway, HttpGateway};
pub use orchestrator::{Orchestrator, Route};
pub use relay::{HttpRelay, Relay};

/// Install the global `tracing` subscriber.  `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chatrobot_client=debug,chatrobot_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
