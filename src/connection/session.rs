// src/connection/session.rs

//! Defines the state associated with a single client session.

use crate::core::commands::{CommandContext, CommandTree, Continuation};

/// The prompt shown when no command set can be re-entered.
pub const BARE_PROMPT: &str = "> ";

/// Holds the state specific to a single client session.
#[derive(Debug, Default)]
pub struct SessionState {
    /// What the session is waiting for. Starts at the top of the tree.
    cont: Continuation,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continuation(&self) -> &Continuation {
        &self.cont
    }

    /// Feeds one user command line and returns the full response text,
    /// ending with the prompt for the next line.
    pub fn feed(&mut self, ctx: &CommandContext<'_>, line: &str) -> String {
        let tree = &ctx.state.commands;
        let cont = std::mem::take(&mut self.cont);
        let step = tree.step(ctx, cont, line);

        if let Some(next) = step.next {
            self.cont = next;
            return step.output;
        }

        let (tip, next) = recover(tree, ctx, &step.path);
        self.cont = next;
        if step.output.is_empty() {
            tip
        } else {
            format!("{}\n{}", step.output, tip)
        }
    }
}

/// Picks the context after a finished interaction: the command set one level
/// above the leaf that just completed, re-entered by replaying its path from
/// the top. Replay only ever passes through groups, so no action runs twice.
fn recover(
    tree: &CommandTree,
    ctx: &CommandContext<'_>,
    path: &[String],
) -> (String, Continuation) {
    let fallback = || (BARE_PROMPT.to_string(), Continuation::root());

    let Some((_, parent)) = path.split_last() else {
        return fallback();
    };
    if parent.is_empty() || tree.resolve_group(parent).is_none() {
        return fallback();
    }
    // A mode change during the leaf can lock the session out of its parent.
    if !tree.grants_path(parent, ctx.connection.mode()) {
        return fallback();
    }

    let replay = tree.step(ctx, Continuation::root(), &parent.join(" "));
    match replay.next {
        Some(next) if next.is_menu() && next.path == parent => (replay.output, next),
        _ => fallback(),
    }
}
