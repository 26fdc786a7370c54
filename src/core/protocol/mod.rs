// src/core/protocol/mod.rs

//! The wire protocol: chunked framing of logical messages and the
//! `path\npayload` message layout carried inside them.

pub mod frame;
pub mod message;
pub use frame::{ChunkCodec, DEFAULT_BUF_SIZE, MAX_BUF_SIZE, MAX_MESSAGE_SIZE};
pub use message::{ControlPath, Message};
