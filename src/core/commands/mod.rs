// src/core/commands/mod.rs

//! The hierarchical command tree, its built-in commands, and the step
//! function sessions drive it with.

mod builtin;
pub mod dispatcher;
pub mod leaf;
pub mod tree;

pub use dispatcher::{ABORTED, CommandContext, Continuation, Pending, Step};
pub use leaf::{CONCEAL, Leaf, LeafOutcome, LeafState, REVEAL};
pub use tree::{Command, CommandKind, CommandSet, CommandTree};
