//! # chatrobot-shared
//!
//! Vocabulary shared by the chat client and the relay server: the JSON
//! bodies exchanged with the hosted AI gateway, the relay's request and
//! response shapes, and a handful of small domain enums.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod types;

pub use error::SharedError;
pub use types::{ImageRef, MessageStatus, Role};
