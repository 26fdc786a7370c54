// src/core/state/stats.rs

//! Server-wide counters shown to administrators alongside the connection table.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct StatsState {
    /// Connections accepted since startup, including those turned away.
    total_connections: AtomicU64,
    /// Connections refused because `max_clients` was reached.
    rejected_connections: AtomicU64,
    /// User command lines processed since startup.
    total_commands: AtomicU64,
    /// Sessions terminated by `sudo conn kill`.
    killed_sessions: AtomicU64,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_rejected_connections(&self) -> u64 {
        self.rejected_connections.load(Ordering::Relaxed)
    }

    pub fn increment_total_commands(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    pub fn increment_killed_sessions(&self) {
        self.killed_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_killed_sessions(&self) -> u64 {
        self.killed_sessions.load(Ordering::Relaxed)
    }
}
