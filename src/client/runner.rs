// src/client/runner.rs

//! The two ways the `zcli` binary drives a session.

use super::ShellClient;
use super::console::Console;
use crate::connection::BARE_PROMPT;
use crate::core::ShellError;
use std::future::Future;
use std::io;
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;

/// Close reasons the client sends.
pub const CLOSE_INTERRUPTED: &str = "interrupted";
pub const CLOSE_END_OF_INPUT: &str = "end of input";
pub const CLOSE_BATCH_DONE: &str = "batch finished";

/// Reads lines until input ends or `interrupt` resolves. Each line may hold
/// several `;`-separated commands; only the last response is shown, as the
/// prompt for the next line.
///
/// The console is driven from its own thread. A read still blocked on the
/// terminal when `interrupt` fires is abandoned, so the caller can exit
/// without waiting for another line of input.
pub async fn run_interactive<C>(
    mut client: ShellClient,
    console: C,
    interrupt: impl Future<Output = ()>,
) -> Result<(), ShellError>
where
    C: Console + Send + 'static,
{
    tokio::pin!(interrupt);
    let mut tip = client.execute("--help").await?;
    let (prompt_tx, mut line_rx) = spawn_console_reader(console)?;

    loop {
        if prompt_tx.send(tip.clone()).is_err() {
            return Err(ShellError::Internal("console reader stopped".into()));
        }

        let line = tokio::select! {
            _ = &mut interrupt => {
                return client.close(CLOSE_INTERRUPTED).await;
            }
            line = line_rx.recv() => line
                .ok_or_else(|| ShellError::Internal("console reader stopped".into()))?,
        };

        let Some(line) = line? else {
            return client.close(CLOSE_END_OF_INPUT).await;
        };
        for cmd in line.split(';') {
            tip = client.execute(cmd).await?;
        }
    }
}

type LineResult = io::Result<Option<String>>;

/// Starts a detached thread that shows each prompt it is sent and answers
/// with the line read. It exits once either channel is dropped.
fn spawn_console_reader<C>(
    mut console: C,
) -> Result<(std_mpsc::Sender<String>, mpsc::Receiver<LineResult>), ShellError>
where
    C: Console + Send + 'static,
{
    let (prompt_tx, prompt_rx) = std_mpsc::channel::<String>();
    let (line_tx, line_rx) = mpsc::channel::<LineResult>(1);
    std::thread::Builder::new()
        .name("zcli-console".into())
        .spawn(move || {
            while let Ok(prompt) = prompt_rx.recv() {
                let line = console.read_line(&prompt);
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok((prompt_tx, line_rx))
}

/// Runs each `;`-separated command in order, echoing the command and every
/// response, then closes the session.
pub async fn run_batch<C: Console>(
    mut client: ShellClient,
    console: &mut C,
    commands: &str,
) -> Result<(), ShellError> {
    console.print(BARE_PROMPT)?;
    for cmd in commands.split(';') {
        console.print(&format!("{cmd}\n"))?;
        let response = client.execute(cmd).await?;
        console.print(&response)?;
    }
    console.print("\n")?;
    client.close(CLOSE_BATCH_DONE).await
}
