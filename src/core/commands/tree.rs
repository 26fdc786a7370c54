// src/core/commands/tree.rs

//! The static, named, hierarchical command table.
//!
//! A tree is built once at startup and never mutated afterwards, so every
//! session reads it concurrently without locking.

use super::leaf::Leaf;
use crate::core::permission::Mode;
use std::collections::BTreeMap;

/// What a command does when selected.
#[derive(Debug, Clone)]
pub enum CommandKind {
    /// A nested command set; selecting it moves the session one level down.
    Group(CommandSet),
    /// An action that produces output, possibly after further prompts.
    Leaf(Leaf),
}

/// A named node in the tree.
#[derive(Debug, Clone)]
pub struct Command {
    pub usage: String,
    pub required: Mode,
    pub kind: CommandKind,
}

impl Command {
    pub fn as_group(&self) -> Option<&CommandSet> {
        match &self.kind {
            CommandKind::Group(set) => Some(set),
            CommandKind::Leaf(_) => None,
        }
    }
}

/// The commands available at one level, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: BTreeMap<String, Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a nested command set.
    pub fn group(
        mut self,
        name: impl Into<String>,
        usage: impl Into<String>,
        required: Mode,
        set: CommandSet,
    ) -> Self {
        self.commands.insert(
            name.into(),
            Command {
                usage: usage.into(),
                required,
                kind: CommandKind::Group(set),
            },
        );
        self
    }

    /// Adds an action.
    pub fn leaf(
        mut self,
        name: impl Into<String>,
        usage: impl Into<String>,
        required: Mode,
        leaf: Leaf,
    ) -> Self {
        self.commands.insert(
            name.into(),
            Command {
                usage: usage.into(),
                required,
                kind: CommandKind::Leaf(leaf),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Command)> {
        self.commands.iter().map(|(name, cmd)| (name.as_str(), cmd))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// The root command set plus the program name used in usage text.
#[derive(Debug, Clone)]
pub struct CommandTree {
    name: String,
    root: CommandSet,
}

impl CommandTree {
    pub fn new(name: impl Into<String>, root: CommandSet) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &CommandSet {
        &self.root
    }

    /// Follows `path` through group nodes only. `None` if any segment is
    /// missing or names a leaf.
    pub fn resolve_group(&self, path: &[String]) -> Option<&CommandSet> {
        path.iter()
            .try_fold(&self.root, |set, segment| set.get(segment)?.as_group())
    }

    /// Finds the command named by the last segment of `path`.
    pub fn resolve_command(&self, path: &[String]) -> Option<&Command> {
        let (last, parents) = path.split_last()?;
        self.resolve_group(parents)?.get(last)
    }

    /// True when `mode` passes the gate of every command along `path`.
    pub fn grants_path(&self, path: &[String], mode: Mode) -> bool {
        let mut set = Some(&self.root);
        for segment in path {
            let Some(cmd) = set.and_then(|set| set.get(segment)) else {
                return false;
            };
            if !mode.grants(cmd.required) {
                return false;
            }
            set = cmd.as_group();
        }
        true
    }

    /// Renders the accumulated path the way it follows the program name,
    /// e.g. `" sudo conn"`.
    pub fn render_path(path: &[String]) -> String {
        path.iter().map(|segment| format!(" {segment}")).collect()
    }

    /// The short prompt shown when entering a command set.
    pub fn tip(&self, path: &[String], set: &CommandSet) -> String {
        let names: Vec<&str> = set.names().collect();
        format!(
            "Usage: {}{} <{}>\n(You can also enter '--help' to check details)\n> ",
            self.name,
            Self::render_path(path),
            names.join(" ")
        )
    }

    /// The detailed usage block listing every immediate child.
    pub fn help(&self, path: &[String], set: &CommandSet) -> String {
        let usages: Vec<String> = set
            .iter()
            .map(|(name, cmd)| format!("    {name:>10}\t{}", cmd.usage))
            .collect();
        format!(
            "Usage: {}{} <Command>\n\nCommands list:\n{}\n> ",
            self.name,
            Self::render_path(path),
            usages.join("\n")
        )
    }
}
