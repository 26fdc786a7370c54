// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::registry::ConnectionRegistry;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::commands::CommandTree;
use crate::core::identity::{IdentityStore, StubIdentityStore};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload};

/// A handle to the server's logging filter, allowing `sudo log` to change it.
pub type LogReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// The state shared by every session task.
///
/// Apart from the registry and the counters, everything here is immutable once
/// the server has started, so sessions read it without synchronization.
#[derive(Debug)]
pub struct ServerState {
    /// The resolved server configuration.
    pub config: Config,
    /// All live connections.
    pub registry: ConnectionRegistry,
    /// The command tree every session dispatches against.
    pub commands: CommandTree,
    /// Backs the `sign in` / `sign up` commands.
    pub identity: Arc<dyn IdentityStore>,
    /// A handle to the logging filter, for runtime log level changes.
    pub log_reload_handle: Arc<LogReloadHandle>,
    pub stats: StatsState,
    pub started_at: DateTime<Local>,
}

impl ServerState {
    /// Builds the server state with the built-in command tree and the stub
    /// identity store configured from `config.auth`.
    pub fn initialize(config: Config, log_reload_handle: Arc<LogReloadHandle>) -> Arc<Self> {
        let identity = Arc::new(StubIdentityStore::new(config.auth.root_names.clone()));
        Self::with_identity(config, log_reload_handle, identity)
    }

    /// Builds the server state around a caller-provided identity store.
    pub fn with_identity(
        config: Config,
        log_reload_handle: Arc<LogReloadHandle>,
        identity: Arc<dyn IdentityStore>,
    ) -> Arc<Self> {
        let commands = CommandTree::builtin(&config.name);
        info!(
            "Command tree for '{}' initialized with {} top-level commands.",
            config.name,
            commands.root().len()
        );
        Arc::new(Self {
            config,
            registry: ConnectionRegistry::new(),
            commands,
            identity,
            log_reload_handle,
            stats: StatsState::new(),
            started_at: Local::now(),
        })
    }
}
