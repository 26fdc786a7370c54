// src/server/mod.rs

//! The listening side: binding, the accept loop, background tasks and shutdown.

use crate::config::Config;
use crate::core::state::{LogReloadHandle, ServerState};
use crate::transport::Endpoint;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

pub use connection_loop::CLOSE_TOO_MANY;

/// A bound server that has not started accepting yet.
pub struct Server {
    ctx: context::ServerContext,
}

impl Server {
    /// Initializes state and binds the configured address.
    pub async fn bind(config: Config, log_reload_handle: Arc<LogReloadHandle>) -> Result<Self> {
        let ctx = initialization::setup(config, log_reload_handle).await?;
        Ok(Self { ctx })
    }

    /// The address actually bound, with the real port when `:0` was configured.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Ok(self.ctx.listener.local_endpoint()?)
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.ctx.state.clone()
    }

    /// Spawns background tasks and accepts connections until `shutdown` resolves.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        spawner::spawn_all(&mut self.ctx)?;
        connection_loop::run(self.ctx, shutdown).await;
        Ok(())
    }
}

/// The main server startup function, orchestrating all setup phases. Runs
/// until SIGINT or SIGTERM.
pub async fn run(config: Config, log_reload_handle: Arc<LogReloadHandle>) -> Result<()> {
    let server = Server::bind(config, log_reload_handle).await?;
    server.run_until(shutdown_signal()).await
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        info!("SIGINT received.");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received.");
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
