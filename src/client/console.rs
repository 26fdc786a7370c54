// src/client/console.rs

//! Line input and output for the client, behind a trait so sessions can be
//! driven by a script instead of a terminal.

use std::io::{self, BufRead, Write};

/// The terminal the client talks to.
pub trait Console {
    /// Shows `prompt` and blocks for one line, without its trailing newline.
    /// `None` means the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Writes `text` as-is.
    fn print(&mut self, text: &str) -> io::Result<()>;
}

/// Standard input and output.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.print(prompt)?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}
