// src/core/state/mod.rs

//! Defines the central `ServerState` struct and the state components it owns.

mod core;
mod registry;
mod stats;

pub use self::core::{LogReloadHandle, ServerState};
pub use registry::{Connection, ConnectionRegistry, KillReceiver, KillSender};
pub use stats::StatsState;
