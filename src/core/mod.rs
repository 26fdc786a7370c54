// src/core/mod.rs

//! The central module containing the core logic and data structures of the shell:
//! wire protocol, permission model, command tree and shared server state.

pub mod commands;
pub mod errors;
pub mod identity;
pub mod metrics;
pub mod permission;
pub mod protocol;
pub mod state;

pub use errors::ShellError;
pub use permission::Mode;
pub use protocol::Message;
