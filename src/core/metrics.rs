// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};

lazy_static! {
    // --- Server-wide Gauges ---
    /// The number of clients currently connected to the server.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("zcli_connected_clients", "Number of currently connected clients.").unwrap();


    // --- Server-wide Counters ---
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("zcli_connections_received_total", "Total number of connections received.").unwrap();
    /// The total number of user command lines processed since startup.
    pub static ref COMMANDS_PROCESSED_TOTAL: Counter =
        register_counter!("zcli_commands_processed_total", "Total number of command lines processed.").unwrap();
    /// Commands refused because the connection's mode did not grant them.
    pub static ref PERMISSION_DENIALS_TOTAL: Counter =
        register_counter!("zcli_permission_denials_total", "Total number of commands denied by mode.").unwrap();
    /// Sessions terminated by an administrator.
    pub static ref SESSIONS_KILLED_TOTAL: Counter =
        register_counter!("zcli_sessions_killed_total", "Total number of sessions killed by an administrator.").unwrap();
    /// Sessions torn down by a protocol violation, labeled by the kind of violation.
    pub static ref PROTOCOL_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("zcli_protocol_errors_total", "Total number of protocol errors, labeled by kind.", &["kind"]).unwrap();


    // --- Histograms ---
    /// A histogram of command line processing latencies.
    pub static ref COMMAND_LATENCY_SECONDS: Histogram =
        register_histogram!("zcli_command_latency_seconds", "Latency of command processing in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
