//! # chatrobot-store
//!
//! Local storage for the chat client, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users,
//! conversations, messages and per-user config.  Every write is announced on
//! a change feed so that [`LiveQuery`] handles can re-run their query and push
//! fresh results to whoever is rendering them.

pub mod config;
pub mod conversations;
pub mod database;
pub mod live;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::{lock, Database, SharedDatabase};
pub use error::{Result, StoreError};
pub use live::{Change, LiveQuery};
pub use models::*;
