// src/core/commands/builtin.rs

//! The command tree every server ships with.

use super::leaf::Leaf;
use super::tree::{CommandSet, CommandTree};
use crate::core::permission::Mode;

impl CommandTree {
    /// Builds the standard tree under the program name `name`.
    pub fn builtin(name: &str) -> Self {
        let sign = CommandSet::new()
            .leaf("in", "Sign in.", Mode::ALL, Leaf::SignIn)
            .leaf("out", "Sign out.", Mode::REGISTERED, Leaf::SignOut)
            .leaf("up", "Sign up account.", Mode::GUEST, Leaf::SignUp);

        let conn = CommandSet::new()
            .leaf("ls", "List connected cli-clients.", Mode::ROOT_READ, Leaf::ConnList)
            .leaf(
                "kill",
                "Kill a connected cli-client by id.",
                Mode::ROOT_EXEC,
                Leaf::ConnKill,
            );

        let sudo = CommandSet::new()
            .group("conn", "Manage connected cli-clients.", Mode::ROOT, conn)
            .leaf("log", "Change the server log filter.", Mode::ROOT_WRITE, Leaf::LogFilter);

        let root = CommandSet::new()
            .group("sign", "Sign in|out|up.", Mode::ALL, sign)
            .group("sudo", "Manage the cli-server.", Mode::ROOT, sudo)
            .leaf(
                "whoami",
                "Show the identity of this connection.",
                Mode::ALL,
                Leaf::WhoAmI,
            );

        CommandTree::new(name, root)
    }
}
