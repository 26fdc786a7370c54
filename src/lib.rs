// src/lib.rs

pub mod client;
pub mod config;
pub mod connection;
pub mod core;
pub mod server;
pub mod transport;

// Re-export
pub use crate::client::ShellClient;
pub use crate::core::ShellError;
