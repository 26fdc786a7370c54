// src/bin/zcli.rs

//! The command-line client for a zcli server.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zcli::ShellError;
use zcli::client::{self, ShellClient, StdConsole};

/// Connects to a zcli server and runs commands on it.
#[derive(Parser, Debug)]
#[command(name = "zcli", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Server address: `host:port`, or a path ending in `.sock` for a local socket.
    #[arg(long)]
    addr: String,
    /// Semicolon-separated commands to run non-interactively, e.g. "whoami;sign in;alice;secret".
    #[arg(short = 'c', value_name = "COMMANDS")]
    commands: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let result = match ShellClient::connect(&args.addr).await {
        Ok(client) => match args.commands {
            Some(commands) => client::run_batch(client, &mut StdConsole, &commands).await,
            None => {
                let interrupt = async {
                    let _ = tokio::signal::ctrl_c().await;
                };
                client::run_interactive(client, StdConsole, interrupt).await
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShellError::ClosedByPeer(reason)) => {
            println!("\nremote server has closed the connection: {reason}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
