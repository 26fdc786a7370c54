// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::ConnectionHandler;
use crate::core::metrics;
use crate::core::protocol::{ChunkCodec, ControlPath, Message};
use crate::transport::AnyStream;
use futures::SinkExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

/// Reason sent to connections turned away at the `max_clients` limit.
pub const CLOSE_TOO_MANY: &str = "too many connections";

/// How long sessions get to say goodbye once shutdown has been signalled.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The main server loop that accepts connections until `shutdown` resolves,
/// then shuts every session down.
pub async fn run(mut ctx: ServerContext, shutdown: impl Future<Output = ()>) {
    let mut client_tasks = JoinSet::new();
    let max_clients = ctx.state.config.max_clients;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, peer)) => {
                        ctx.state.stats.increment_total_connections();
                        metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                        if ctx.state.registry.len() >= max_clients {
                            warn!("Rejecting connection from {}: max_clients ({}) reached.", peer, max_clients);
                            ctx.state.stats.increment_rejected_connections();
                            client_tasks.spawn(reject(socket));
                        } else {
                            let (conn, kill_rx) = ctx.state.registry.register(peer);
                            debug!("Accepted connection {} from {}", conn.id, conn.peer);
                            let state = ctx.state.clone();
                            let global_shutdown_rx = ctx.shutdown_tx.subscribe();

                            client_tasks.spawn(async move {
                                let id = conn.id;
                                let peer = conn.peer.clone();
                                let mut handler = ConnectionHandler::new(socket, conn, state, kill_rx, global_shutdown_rx);
                                if let Err(e) = handler.run().await {
                                    if e.is_normal_disconnect() {
                                        debug!("Connection {} from {} closed by peer: {}", id, peer, e);
                                    } else {
                                        warn!("Connection {} from {} terminated: {}", id, peer, e);
                                    }
                                }
                            });
                        }
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No session or background task was listening for shutdown.");
    }

    if tokio::time::timeout(SESSION_DRAIN_TIMEOUT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for sessions to close; aborting the rest.");
        client_tasks.shutdown().await;
    }
    let leftover = ctx.state.registry.kill_all();
    if leftover > 0 {
        debug!("Dropped {} registry entries left by aborted sessions.", leftover);
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
}

/// Tells a connection over the limit why it is being dropped.
async fn reject(socket: AnyStream) {
    let mut framed = Framed::new(socket, ChunkCodec::default());
    if let Err(e) = framed
        .send(Message::control(ControlPath::Close, CLOSE_TOO_MANY))
        .await
    {
        debug!("Failed to notify rejected connection: {}", e);
    }
}
