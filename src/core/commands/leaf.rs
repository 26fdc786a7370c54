// src/core/commands/leaf.rs

//! The actions at the leaves of the command tree and the explicit states a
//! multi-step action waits in between input lines.

use super::dispatcher::CommandContext;
use crate::core::metrics;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Prompt suffix asking the client to hide what is typed next.
pub const CONCEAL: &str = "\x1b[8m";
/// Response prefix undoing [`CONCEAL`].
pub const REVEAL: &str = "\x1b[28m";

/// Every action the server knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf {
    SignIn,
    SignUp,
    SignOut,
    WhoAmI,
    ConnList,
    ConnKill,
    LogFilter,
}

/// "Awaiting field X of command Y".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafState {
    SignInName,
    SignInPassword { name: String },
    SignUpName,
    SignUpPassword { name: String },
    SignOutConfirm,
    KillTarget,
    LogFilter,
}

/// The result of starting or resuming a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafOutcome {
    /// Show the prompt and wait in the given state for the next line.
    Prompt(String, LeafState),
    /// The interaction is over; show the output.
    Done(String),
}

impl Leaf {
    /// Runs the action up to its first prompt, or to completion.
    pub fn start(self, ctx: &CommandContext<'_>) -> LeafOutcome {
        match self {
            Leaf::SignIn => LeafOutcome::Prompt("Name: ".into(), LeafState::SignInName),
            Leaf::SignUp => LeafOutcome::Prompt("Name: ".into(), LeafState::SignUpName),
            Leaf::SignOut => LeafOutcome::Prompt(
                "Confirm to logout? (y/N) ".into(),
                LeafState::SignOutConfirm,
            ),
            Leaf::WhoAmI => LeafOutcome::Done(whoami(ctx)),
            Leaf::ConnList => LeafOutcome::Done(connection_table(ctx)),
            Leaf::ConnKill => LeafOutcome::Prompt("Connection id: ".into(), LeafState::KillTarget),
            Leaf::LogFilter => LeafOutcome::Prompt("Log filter: ".into(), LeafState::LogFilter),
        }
    }
}

impl LeafState {
    /// Feeds one non-empty input line to the waiting action.
    pub fn resume(self, ctx: &CommandContext<'_>, line: &str) -> LeafOutcome {
        match self {
            LeafState::SignInName => LeafOutcome::Prompt(
                format!("Password: {CONCEAL}"),
                LeafState::SignInPassword {
                    name: line.trim().to_string(),
                },
            ),
            LeafState::SignInPassword { name } => {
                LeafOutcome::Done(match ctx.state.identity.sign_in(&name, line) {
                    Ok(mode) => {
                        ctx.connection.mode.elevate(mode);
                        info!(
                            "Connection {} signed in as '{}' with mode {}.",
                            ctx.connection.id, name, mode
                        );
                        format!("{REVEAL}Signed in: {name} (mode {mode})")
                    }
                    Err(e) => format!("{REVEAL}Sign in failed: {e}"),
                })
            }
            LeafState::SignUpName => LeafOutcome::Prompt(
                format!("Password: {CONCEAL}"),
                LeafState::SignUpPassword {
                    name: line.trim().to_string(),
                },
            ),
            LeafState::SignUpPassword { name } => {
                LeafOutcome::Done(match ctx.state.identity.sign_up(&name, line) {
                    Ok(mode) => {
                        ctx.connection.mode.elevate(mode);
                        info!(
                            "Connection {} signed up as '{}'.",
                            ctx.connection.id, name
                        );
                        format!("{REVEAL}Signed up: {name} (mode {mode})")
                    }
                    Err(e) => format!("{REVEAL}Sign up failed: {e}"),
                })
            }
            LeafState::SignOutConfirm => {
                let answer = line.trim().to_ascii_lowercase();
                if answer == "y" || answer == "yes" {
                    ctx.connection.mode.revoke();
                    info!("Connection {} signed out.", ctx.connection.id);
                    LeafOutcome::Done("Signed out.".into())
                } else {
                    LeafOutcome::Done("Sign out cancelled.".into())
                }
            }
            LeafState::KillTarget => LeafOutcome::Done(kill(ctx, line.trim())),
            LeafState::LogFilter => LeafOutcome::Done(set_log_filter(ctx, line.trim())),
        }
    }
}

fn whoami(ctx: &CommandContext<'_>) -> String {
    let conn = ctx.connection;
    let mode = conn.mode();
    format!(
        "id: {}\naddress: {}\nsince: {}\nmode: {} ({})",
        conn.id,
        conn.peer,
        conn.established(),
        mode,
        mode.identity()
    )
}

fn connection_table(ctx: &CommandContext<'_>) -> String {
    let border = format!(
        "--{}---{}---{}---{}--",
        "-".repeat(3),
        "-".repeat(25),
        "-".repeat(19),
        "-".repeat(5)
    );
    let mut lines = vec![
        border.clone(),
        format!("| {:>3} | {:<25} | {:<19} | {:<5} |", "ID", "ADDRESS", "TIME", "MODE"),
        format!(
            "| {}---{}---{}---{} |",
            "-".repeat(3),
            "-".repeat(25),
            "-".repeat(19),
            "-".repeat(5)
        ),
    ];
    for conn in ctx.state.registry.list() {
        let marker = if conn.id == ctx.connection.id { '*' } else { '|' };
        lines.push(format!(
            "{marker} {:>3} | {:<25} | {:<19} | {} |",
            conn.id,
            conn.peer,
            conn.established(),
            conn.mode()
        ));
    }
    lines.push(border);
    let stats = &ctx.state.stats;
    lines.push(format!(
        "{} live, {} accepted, {} rejected, {} killed, {} commands since {}",
        ctx.state.registry.len(),
        stats.get_total_connections(),
        stats.get_rejected_connections(),
        stats.get_killed_sessions(),
        stats.get_total_commands(),
        ctx.state.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.join("\n")
}

fn kill(ctx: &CommandContext<'_>, arg: &str) -> String {
    let id = match arg.parse::<u32>() {
        Ok(id) => id,
        Err(_) => return format!("invalid connection id: '{arg}'"),
    };
    match ctx.state.registry.kill(id) {
        Some(conn) => {
            ctx.state.stats.increment_killed_sessions();
            metrics::SESSIONS_KILLED_TOTAL.inc();
            warn!(
                "Connection {} ({}) killed by connection {}.",
                conn.id, conn.peer, ctx.connection.id
            );
            format!("Killed connection {} ({}).", conn.id, conn.peer)
        }
        None => format!("no conn found, id: {id}"),
    }
}

fn set_log_filter(ctx: &CommandContext<'_>, directive: &str) -> String {
    let filter = match EnvFilter::try_new(directive) {
        Ok(filter) => filter,
        Err(e) => return format!("invalid log filter '{directive}': {e}"),
    };
    match ctx.state.log_reload_handle.reload(filter) {
        Ok(()) => {
            info!(
                "Log filter changed to '{}' by connection {}.",
                directive, ctx.connection.id
            );
            format!("Log filter set to '{directive}'.")
        }
        Err(e) => format!("failed to change log filter: {e}"),
    }
}
