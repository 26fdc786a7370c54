// src/main.rs

//! The main entry point for the zcli server application.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};
use zcli::config::Config;
use zcli::server;

/// Serves the administrative shell over TCP or a local socket.
#[derive(Parser, Debug)]
#[command(name = "zcli-server", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when it does not exist.
    #[arg(long, default_value = "config.toml")]
    config: String,
    /// Overrides the configured address (`host:port` or a `.sock` path).
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // A missing default config file is fine; an explicit or broken one is not.
    let mut config = if std::path::Path::new(&args.config).exists() {
        match Config::from_file(&args.config) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{}\": {e:#}", args.config);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    if let Some(address) = args.address {
        config.address = address;
        if let Err(e) = config.validate() {
            eprintln!("Invalid --address: {e}");
            std::process::exit(1);
        }
    }

    // Setup logging with reloading capabilities.
    // Get initial log level from env var or config.
    let initial_log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());

    // Create a reloadable filter layer.
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));

    // Initialize the global subscriber with the reload and formatting layers.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true), // Enable ANSI color codes for log levels.
        )
        .init();

    // Store the handle in an Arc so `sudo log` can change the filter at runtime.
    let reload_handle = Arc::new(reload_handle);

    if let Err(e) = server::run(config, reload_handle).await {
        error!("Server runtime error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
