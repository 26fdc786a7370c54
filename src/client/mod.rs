// src/client/mod.rs

//! The dialing side: a connection that performs the size handshake and then
//! exchanges command lines for response text.

mod console;
mod runner;

pub use console::{Console, StdConsole};
pub use runner::{run_batch, run_interactive};

use crate::core::ShellError;
use crate::core::protocol::{ChunkCodec, ControlPath, Message};
use crate::transport::{AnyStream, Endpoint};
use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::debug;

/// One synchronized session with a server.
pub struct ShellClient {
    framed: Framed<AnyStream, ChunkCodec>,
    endpoint: Endpoint,
}

impl ShellClient {
    /// Dials `address` and completes the size handshake.
    pub async fn connect(address: &str) -> Result<Self, ShellError> {
        let endpoint = Endpoint::parse(address)?;
        let stream = AnyStream::connect(&endpoint).await?;
        let mut client = Self {
            framed: Framed::new(stream, ChunkCodec::default()),
            endpoint,
        };
        client.handshake().await?;
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The chunk size negotiated with the server.
    pub fn chunk_size(&self) -> usize {
        self.framed.codec().chunk_size()
    }

    /// Waits for the server's size announcement, adopts it and acknowledges it.
    async fn handshake(&mut self) -> Result<(), ShellError> {
        let msg = self.recv().await?;
        match msg.control_path() {
            Some(ControlPath::BufSizeSync) => {
                let size = parse_size(&msg.payload)?;
                self.framed.codec_mut().set_chunk_size(size)?;
                self.send(ControlPath::BufSizeSync, size.to_string()).await?;
                debug!("Synchronized with {} at chunk size {}", self.endpoint, size);
                Ok(())
            }
            Some(ControlPath::Close) => Err(ShellError::ClosedByPeer(msg.payload)),
            _ => Err(ShellError::Protocol(format!(
                "expected a size announcement, got path '{}'",
                msg.path
            ))),
        }
    }

    /// Sends one input line and returns the server's response text.
    pub async fn execute(&mut self, line: &str) -> Result<String, ShellError> {
        self.send(ControlPath::UserCommand, line).await?;
        self.await_reply(ControlPath::UserCommand).await
    }

    /// Round-trips `payload` through the server's ping handler.
    pub async fn ping(&mut self, payload: &str) -> Result<String, ShellError> {
        self.send(ControlPath::Ping, payload).await?;
        self.await_reply(ControlPath::Pong).await
    }

    /// Asks the server for its current chunk size.
    pub async fn query_size(&mut self) -> Result<usize, ShellError> {
        self.send(ControlPath::BufSizeSync, "").await?;
        let reply = self.await_reply(ControlPath::BufSizeSync).await?;
        parse_size(&reply)
    }

    /// Waits for the server to end the session and returns its reason.
    pub async fn wait_closed(&mut self) -> Result<String, ShellError> {
        loop {
            let msg = self.recv().await?;
            if msg.is_sentinel() {
                return Ok(String::new());
            }
            if msg.control_path() == Some(ControlPath::Close) {
                return Ok(msg.payload);
            }
            debug!("Discarding '{}' while waiting for close", msg.path);
        }
    }

    /// Ends the session gracefully.
    pub async fn close(mut self, reason: &str) -> Result<(), ShellError> {
        self.send(ControlPath::Close, reason).await?;
        self.framed.close().await
    }

    async fn send(&mut self, path: ControlPath, payload: impl Into<String>) -> Result<(), ShellError> {
        self.framed.send(Message::control(path, payload)).await
    }

    async fn recv(&mut self) -> Result<Message, ShellError> {
        match self.framed.next().await {
            Some(result) => result,
            None => Err(ShellError::ClosedByPeer("connection closed".into())),
        }
    }

    async fn await_reply(&mut self, expected: ControlPath) -> Result<String, ShellError> {
        loop {
            let msg = self.recv().await?;
            if msg.is_sentinel() {
                return Err(ShellError::ClosedByPeer("end of session".into()));
            }
            match msg.control_path() {
                Some(path) if path == expected => return Ok(msg.payload),
                Some(ControlPath::Close) => return Err(ShellError::ClosedByPeer(msg.payload)),
                Some(ControlPath::BufSizeSync) => {
                    debug!("Ignoring unsolicited size sync: {}", msg.payload);
                }
                _ => return Err(ShellError::UnknownPath(msg.path)),
            }
        }
    }
}

fn parse_size(payload: &str) -> Result<usize, ShellError> {
    payload
        .trim()
        .parse()
        .map_err(|_| ShellError::InvalidBufferSize(payload.to_string()))
}
