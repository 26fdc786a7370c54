// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::metrics;
use crate::core::state::{Connection, ServerState};
use std::sync::Arc;
use tracing::{debug, info};

/// An RAII guard to ensure connection resources are always cleaned up when a
/// connection handler's scope is exited, whichever way it exits.
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    conn: Arc<Connection>,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ServerState>, conn: Arc<Connection>) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self { state, conn }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        if self.state.registry.deregister(&self.conn) {
            debug!("Connection {} removed from the registry.", self.conn.id);
        } else {
            debug!(
                "Connection {} was already gone from the registry upon cleanup (likely killed).",
                self.conn.id
            );
        }
        info!("Connection {} from {} closed.", self.conn.id, self.conn.peer);
    }
}
