// src/connection/mod.rs

//! Manages the lifecycle of a single client connection: the size handshake,
//! control message dispatch, and the command session.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{BARE_PROMPT, SessionState};
