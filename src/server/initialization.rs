// src/server/initialization.rs

//! Handles server initialization: state setup and binding the listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::state::{LogReloadHandle, ServerState};
use crate::transport::{AnyListener, Endpoint};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config, log_reload_handle: Arc<LogReloadHandle>) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let endpoint = Endpoint::parse(&config.address)?;
    let listener = AnyListener::bind(&endpoint)
        .await
        .with_context(|| format!("Failed to bind {endpoint}"))?;
    let bound = listener.local_endpoint()?;

    let state = ServerState::initialize(config, log_reload_handle);
    info!("Server state initialized.");
    info!("'{}' server listening on {}", state.config.name, bound);

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Chunk size {} bytes, at most {} clients.",
        config.buf_size, config.max_clients
    );
    match config.idle_timeout {
        Some(timeout) => info!("Idle sessions are closed after {:?}.", timeout),
        None => info!("No idle timeout configured; silent sessions stay open."),
    }
    if config.auth.root_names.is_empty() {
        warn!("No root names configured. Administrative commands are unreachable.");
    }
}
