// src/core/commands/dispatcher.rs

//! The per-line step function over the command tree.
//!
//! A session never holds a closure. What it is waiting for is a
//! [`Continuation`]: the accumulated path plus a [`Pending`] tag, and
//! [`CommandTree::step`] is the only transition between two of them.

use super::leaf::{LeafOutcome, LeafState};
use super::tree::{CommandKind, CommandSet, CommandTree};
use crate::core::metrics;
use crate::core::state::{Connection, ServerState};
use tracing::debug;

/// Output shown when an interaction is cancelled with an empty line.
pub const ABORTED: &str = "<<<";

/// Everything a command may touch while it runs.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub state: &'a ServerState,
    pub connection: &'a Connection,
}

impl<'a> CommandContext<'a> {
    pub fn new(state: &'a ServerState, connection: &'a Connection) -> Self {
        Self { state, connection }
    }
}

/// What the session is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// A command name at the command set addressed by the path.
    Menu,
    /// The next field of the leaf the path ends at.
    Leaf(LeafState),
}

/// The suspended state of one session's interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub path: Vec<String>,
    pub state: Pending,
}

impl Continuation {
    /// Awaiting a top-level command.
    pub fn root() -> Self {
        Self::menu(Vec::new())
    }

    pub fn menu(path: Vec<String>) -> Self {
        Self {
            path,
            state: Pending::Menu,
        }
    }

    pub fn is_menu(&self) -> bool {
        self.state == Pending::Menu
    }
}

impl Default for Continuation {
    fn default() -> Self {
        Self::root()
    }
}

/// The result of feeding one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Text to send back. When `next` is `Some` this already ends with the
    /// prompt for the next line.
    pub output: String,
    /// The accumulated path after this step, also when the interaction is over.
    pub path: Vec<String>,
    /// `None` once the interaction has finished or was aborted.
    pub next: Option<Continuation>,
}

impl Step {
    fn aborted() -> Self {
        Self {
            output: ABORTED.to_string(),
            path: Vec::new(),
            next: None,
        }
    }

    fn menu(output: String, path: Vec<String>) -> Self {
        Self {
            output,
            next: Some(Continuation::menu(path.clone())),
            path,
        }
    }

    fn prompt(output: String, path: Vec<String>, state: LeafState) -> Self {
        Self {
            output,
            next: Some(Continuation {
                path: path.clone(),
                state: Pending::Leaf(state),
            }),
            path,
        }
    }

    fn done(output: String, path: Vec<String>) -> Self {
        Self {
            output,
            path,
            next: None,
        }
    }
}

impl CommandTree {
    /// Advances `cont` by one input line.
    pub fn step(&self, ctx: &CommandContext<'_>, cont: Continuation, line: &str) -> Step {
        let Continuation { path, state } = cont;
        match state {
            Pending::Menu => self.menu_step(ctx, path, line),
            Pending::Leaf(_) if line.trim().is_empty() => {
                debug!("Connection {} aborted '{}'.", ctx.connection.id, path.join(" "));
                Step::aborted()
            }
            Pending::Leaf(state) => {
                let outcome = state.resume(ctx, line);
                self.settle(path, outcome)
            }
        }
    }

    fn menu_step(&self, ctx: &CommandContext<'_>, mut path: Vec<String>, line: &str) -> Step {
        let Some(set) = self.resolve_group(&path) else {
            return Step::aborted();
        };

        let line = line.trim_start();
        let (head, rest) = match line.split_once(' ') {
            Some((head, rest)) => (head, rest),
            None => (line, ""),
        };
        let head = head.trim_end();

        match head {
            "--help" | "-h" => Step::menu(self.help(&path, set), path),
            "" => Step::aborted(),
            _ => match set.get(head) {
                Some(cmd) => {
                    let mode = ctx.connection.mode();
                    if !mode.grants(cmd.required) {
                        metrics::PERMISSION_DENIALS_TOTAL.inc();
                        let output = format!(
                            "{name}: permission denied: '{name}{path} {head}' requires mode {required}, current mode is {mode}.\n{tip}",
                            name = self.name(),
                            path = Self::render_path(&path),
                            required = cmd.required,
                            tip = self.tip(&path, set),
                        );
                        return Step::menu(output, path);
                    }

                    path.push(head.to_string());
                    match &cmd.kind {
                        CommandKind::Group(sub) if rest.trim().is_empty() => {
                            Step::menu(self.tip(&path, sub), path)
                        }
                        CommandKind::Group(_) => self.menu_step(ctx, path, rest),
                        CommandKind::Leaf(leaf) => {
                            let rest = rest.trim();
                            match leaf.start(ctx) {
                                LeafOutcome::Prompt(prompt, state) if rest.is_empty() => {
                                    Step::prompt(prompt, path, state)
                                }
                                LeafOutcome::Prompt(_, state) => {
                                    let outcome = state.resume(ctx, rest);
                                    self.settle(path, outcome)
                                }
                                LeafOutcome::Done(output) => {
                                    let output = if output.is_empty() {
                                        cmd.usage.clone()
                                    } else {
                                        output
                                    };
                                    if rest.is_empty() {
                                        Step::done(output, path)
                                    } else {
                                        Step::done(
                                            format!(
                                                "{}: redundant argument(s) '{}' ignored.\n{}",
                                                self.name(),
                                                rest,
                                                output
                                            ),
                                            path,
                                        )
                                    }
                                }
                            }
                        }
                    }
                }
                None => self.invalid_option(&path, set, head),
            },
        }
    }

    fn invalid_option(&self, path: &[String], set: &CommandSet, head: &str) -> Step {
        let output = format!(
            "{name}: invalid option: '{head}' for command '{name}{path}'.\n{tip}",
            name = self.name(),
            path = Self::render_path(path),
            tip = self.tip(path, set),
        );
        Step::menu(output, path.to_vec())
    }

    fn settle(&self, path: Vec<String>, outcome: LeafOutcome) -> Step {
        match outcome {
            LeafOutcome::Prompt(prompt, state) => Step::prompt(prompt, path, state),
            LeafOutcome::Done(output) if output.is_empty() => {
                let usage = self
                    .resolve_command(&path)
                    .map(|cmd| cmd.usage.clone())
                    .unwrap_or_default();
                Step::done(usage, path)
            }
            LeafOutcome::Done(output) => Step::done(output, path),
        }
    }
}
