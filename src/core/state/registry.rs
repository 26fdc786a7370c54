// src/core/state/registry.rs

//! The live connection registry: every accepted connection, keyed by a small
//! integer id that is reused once freed.
//!
//! All operations take the single registry mutex for their duration and never
//! hand out references into the guarded map.

use crate::core::permission::{Mode, ModeCell};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

pub type KillSender = broadcast::Sender<()>;
pub type KillReceiver = broadcast::Receiver<()>;

/// One accepted transport stream, as seen by the rest of the server.
///
/// The stream itself is owned by the session task. The registry holds the
/// kill switch that makes that task close it.
#[derive(Debug)]
pub struct Connection {
    pub id: u32,
    pub peer: String,
    pub established_at: DateTime<Local>,
    pub mode: ModeCell,
    /// Registration order, used to tell apart two connections that held the
    /// same id at different times.
    seq: u64,
    kill_tx: KillSender,
}

impl Connection {
    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// The establishment time at second precision.
    pub fn established(&self) -> String {
        self.established_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn signal_kill(&self) {
        // No receiver means the session already exited on its own.
        let _ = self.kill_tx.send(());
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    conns: HashMap<u32, Arc<Connection>>,
    /// Every id below the cursor is in use.
    cursor: u32,
    next_seq: u64,
}

impl RegistryInner {
    fn allocate_id(&mut self) -> u32 {
        if self.cursor as usize > 2 * self.conns.len() {
            self.cursor = 0;
        }
        while self.conns.contains_key(&self.cursor) {
            self.cursor += 1;
        }
        self.cursor
    }

    fn release_id(&mut self, id: u32) {
        if id < self.cursor {
            self.cursor = id;
        }
    }
}

/// The process-wide table of live connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection as a guest and returns it with
    /// the receiver its session must watch for administrative kills.
    pub fn register(&self, peer: impl Into<String>) -> (Arc<Connection>, KillReceiver) {
        let (kill_tx, kill_rx) = broadcast::channel(1);
        let mut inner = self.inner.lock();
        let id = inner.allocate_id();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let conn = Arc::new(Connection {
            id,
            peer: peer.into(),
            established_at: Local::now(),
            mode: ModeCell::default(),
            seq,
            kill_tx,
        });
        inner.conns.insert(id, conn.clone());
        (conn, kill_rx)
    }

    /// Removes `conn` if it is still the live holder of its id. Safe to call
    /// any number of times, and after the connection was killed.
    pub fn deregister(&self, conn: &Connection) -> bool {
        let mut inner = self.inner.lock();
        let is_current = inner
            .conns
            .get(&conn.id)
            .is_some_and(|live| live.seq == conn.seq);
        if is_current {
            inner.conns.remove(&conn.id);
            inner.release_id(conn.id);
        }
        is_current
    }

    /// Removes the connection holding `id` and tells its session to close the
    /// stream. Returns `None` when no such connection is live.
    pub fn kill(&self, id: u32) -> Option<Arc<Connection>> {
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner.conns.remove(&id);
            if removed.is_some() {
                inner.release_id(id);
            }
            removed
        };
        if let Some(conn) = &removed {
            conn.signal_kill();
        }
        removed
    }

    /// Signals every live connection to close, e.g. on server shutdown.
    pub fn kill_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock();
            inner.cursor = 0;
            inner.conns.drain().map(|(_, conn)| conn).collect()
        };
        for conn in &drained {
            conn.signal_kill();
        }
        drained.len()
    }

    pub fn lookup(&self, id: u32) -> Option<Arc<Connection>> {
        self.inner.lock().conns.get(&id).cloned()
    }

    /// A snapshot of all live connections, most recently established first.
    pub fn list(&self) -> Vec<Arc<Connection>> {
        let mut conns: Vec<_> = self.inner.lock().conns.values().cloned().collect();
        conns.sort_by(|a, b| {
            b.established_at
                .timestamp()
                .cmp(&a.established_at.timestamp())
                .then(b.seq.cmp(&a.seq))
        });
        conns
    }

    pub fn len(&self) -> usize {
        self.inner.lock().conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
