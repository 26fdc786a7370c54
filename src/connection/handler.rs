// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::ConnectionGuard;
use super::session::SessionState;
use crate::core::commands::CommandContext;
use crate::core::metrics;
use crate::core::protocol::{ChunkCodec, ControlPath, Message};
use crate::core::state::{Connection, KillReceiver, ServerState};
use crate::core::ShellError;
use crate::transport::AnyStream;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info};

/// Reasons sent with `/sys/close` when the server ends a session.
pub const CLOSE_SHUTDOWN: &str = "server shutting down";
pub const CLOSE_KILLED: &str = "killed by administrator";
pub const CLOSE_IDLE: &str = "idle timeout";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// The size announcement was sent; no user command is admitted yet.
    AwaitingSizeSync,
    Ready,
}

/// The next step for the connection's main loop to take.
enum NextAction {
    Continue,
    ExitLoop,
}

/// Manages the full lifecycle of a client connection.
pub struct ConnectionHandler {
    framed: Framed<AnyStream, ChunkCodec>,
    conn: Arc<Connection>,
    state: Arc<ServerState>,
    kill_rx: KillReceiver,
    global_shutdown_rx: broadcast::Receiver<()>,
    session: SessionState,
    phase: Phase,
}

impl ConnectionHandler {
    /// Creates a new `ConnectionHandler` for an already registered connection.
    pub fn new(
        socket: AnyStream,
        conn: Arc<Connection>,
        state: Arc<ServerState>,
        kill_rx: KillReceiver,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            framed: Framed::new(socket, ChunkCodec::default()),
            conn,
            state,
            kill_rx,
            global_shutdown_rx,
            session: SessionState::new(),
            phase: Phase::AwaitingSizeSync,
        }
    }

    /// The main event loop for the connection, handling incoming messages and signals.
    ///
    /// Returns an error only for transport and protocol failures. The
    /// connection is deregistered on every exit path.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        let _guard = ConnectionGuard::new(self.state.clone(), self.conn.clone());
        info!(
            "Connection {} established from {}.",
            self.conn.id, self.conn.peer
        );

        self.announce_buffer_size().await?;
        let idle_timeout = self.state.config.idle_timeout;

        loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Connection {} received GLOBAL shutdown signal.", self.conn.id);
                    self.close(CLOSE_SHUTDOWN).await;
                    break;
                }
                _ = self.kill_rx.recv() => {
                    info!("Connection {} received kill signal.", self.conn.id);
                    self.close(CLOSE_KILLED).await;
                    break;
                }
                _ = idle(idle_timeout) => {
                    info!("Connection {} idle for too long.", self.conn.id);
                    self.close(CLOSE_IDLE).await;
                    break;
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(msg)) => {
                            debug!("Connection {}: received message on path '{}'", self.conn.id, msg.path);
                            match self.process_message(msg).await {
                                Ok(NextAction::Continue) => {}
                                Ok(NextAction::ExitLoop) => break,
                                Err(e) => return Err(self.fail(e).await),
                            }
                        }
                        Some(Err(e)) => return Err(self.fail(e).await),
                        None => {
                            debug!("Connection {} closed by peer.", self.conn.id);
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Sends the negotiated chunk size, then switches this side's codec to it.
    /// The announcement itself is a single terminal chunk, which every peer
    /// can decode before it knows the size.
    async fn announce_buffer_size(&mut self) -> Result<(), ShellError> {
        let b = self.state.config.buf_size;
        self.framed
            .send(Message::control(ControlPath::BufSizeSync, b.to_string()))
            .await?;
        self.framed.codec_mut().set_chunk_size(b)?;
        debug!("Connection {}: announced chunk size {}", self.conn.id, b);
        Ok(())
    }

    async fn process_message(&mut self, msg: Message) -> Result<NextAction, ShellError> {
        if msg.is_sentinel() {
            debug!("Connection {} sent the end-of-session sentinel.", self.conn.id);
            return Ok(NextAction::ExitLoop);
        }

        match msg.control_path() {
            Some(ControlPath::Close) => {
                info!(
                    "Connection {} closed by client: {}",
                    self.conn.id, msg.payload
                );
                Ok(NextAction::ExitLoop)
            }
            Some(ControlPath::BufSizeSync) => self.handle_size_sync(&msg.payload).await,
            Some(ControlPath::Ping) => {
                self.framed
                    .send(Message::control(ControlPath::Pong, msg.payload))
                    .await?;
                Ok(NextAction::Continue)
            }
            Some(ControlPath::UserCommand) => {
                if self.phase != Phase::Ready {
                    return Err(ShellError::NotSynced);
                }
                self.handle_command(&msg.payload).await?;
                Ok(NextAction::Continue)
            }
            Some(ControlPath::Pong) | None => Err(ShellError::UnknownPath(msg.path)),
        }
    }

    /// An empty payload asks for the current size; a number acknowledges it.
    async fn handle_size_sync(&mut self, payload: &str) -> Result<NextAction, ShellError> {
        let b = self.framed.codec().chunk_size();
        let payload = payload.trim();
        if payload.is_empty() {
            self.framed
                .send(Message::control(ControlPath::BufSizeSync, b.to_string()))
                .await?;
            return Ok(NextAction::Continue);
        }

        let actual: usize = payload
            .parse()
            .map_err(|_| ShellError::InvalidBufferSize(payload.to_string()))?;
        if actual != b {
            return Err(ShellError::BufferSizeMismatch {
                expected: b,
                actual,
            });
        }
        if self.phase == Phase::AwaitingSizeSync {
            self.phase = Phase::Ready;
            debug!("Connection {} synchronized at chunk size {}", self.conn.id, b);
        }
        Ok(NextAction::Continue)
    }

    async fn handle_command(&mut self, line: &str) -> Result<(), ShellError> {
        let started = Instant::now();
        self.state.stats.increment_total_commands();
        metrics::COMMANDS_PROCESSED_TOTAL.inc();
        // The line may be a password, so only its size is logged.
        debug!(
            "Connection {}: command line of {} bytes",
            self.conn.id,
            line.len()
        );

        let ctx = CommandContext::new(&self.state, &self.conn);
        let response = self.session.feed(&ctx, line);
        metrics::COMMAND_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

        self.framed
            .send(Message::control(ControlPath::UserCommand, response))
            .await
    }

    /// Best-effort graceful close.
    async fn close(&mut self, reason: &str) {
        if let Err(e) = self
            .framed
            .send(Message::control(ControlPath::Close, reason))
            .await
        {
            debug!(
                "Connection {}: failed to send close notice: {}",
                self.conn.id, e
            );
        }
    }

    /// Records a fatal session error and tells the peer why, when the stream
    /// is still usable.
    async fn fail(&mut self, e: ShellError) -> ShellError {
        if !matches!(e, ShellError::Io(_)) {
            metrics::PROTOCOL_ERRORS_TOTAL
                .with_label_values(&[e.kind()])
                .inc();
            self.close(&e.to_string()).await;
        }
        e
    }
}

async fn idle(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
