// src/core/protocol/message.rs

//! Defines the logical message (`path` + `"\n"` + `payload`) and the set of
//! paths the session loops route on.

use bytes::{BufMut, BytesMut};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// The separator between the path line and the payload of a logical message.
const SEPARATOR: u8 = b'\n';

/// The control and user paths understood by both ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ControlPath {
    /// Negotiates the per-connection chunk size. Empty payload is a request,
    /// an integer payload is an announcement or acknowledgement.
    ///
    /// The server opens a connection with an announcement of its size rather
    /// than a request, and the client echoes that size back as its
    /// acknowledgement. Requests are still answered at any time.
    #[strum(serialize = "/sys/buf/size/sync")]
    BufSizeSync,
    /// Graceful termination; the payload is a free-text reason.
    #[strum(serialize = "/sys/close")]
    Close,
    /// Liveness probe sent by a client.
    #[strum(serialize = "/sys/ping")]
    Ping,
    /// Reply to `/sys/ping`, echoing its payload.
    #[strum(serialize = "/sys/pong")]
    Pong,
    /// One line of user input (client to server) or response text (server to client).
    #[strum(serialize = "/usr/cmd")]
    UserCommand,
}

/// A decoded logical message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub path: String,
    pub payload: String,
}

impl Message {
    pub fn new(path: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            payload: payload.into(),
        }
    }

    /// Builds a message addressed to one of the well-known paths.
    pub fn control(path: ControlPath, payload: impl Into<String>) -> Self {
        let path: &'static str = path.into();
        Self::new(path, payload)
    }

    /// The end-of-session sentinel: an empty path.
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// Splits a raw logical message on its first newline. A message with no
    /// newline is all path and an empty payload.
    pub fn parse(raw: &[u8]) -> Self {
        match raw.iter().position(|b| *b == SEPARATOR) {
            Some(pos) => Self {
                path: String::from_utf8_lossy(&raw[..pos]).into_owned(),
                payload: String::from_utf8_lossy(&raw[pos + 1..]).into_owned(),
            },
            None => Self {
                path: String::from_utf8_lossy(raw).into_owned(),
                payload: String::new(),
            },
        }
    }

    /// Resolves the path against the well-known set.
    pub fn control_path(&self) -> Option<ControlPath> {
        self.path.parse().ok()
    }

    pub fn is_sentinel(&self) -> bool {
        self.path.is_empty()
    }

    /// The number of bytes this message occupies before chunking.
    pub fn encoded_len(&self) -> usize {
        self.path.len() + 1 + self.payload.len()
    }

    /// Writes the logical `path\npayload` body into `dst`.
    pub fn write_body(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(self.path.as_bytes());
        dst.put_u8(SEPARATOR);
        dst.put_slice(self.payload.as_bytes());
    }
}
