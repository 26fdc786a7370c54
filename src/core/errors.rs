// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, covering the failures that cross the session boundary.
///
/// Only transport and protocol problems are represented here. Everything the
/// command dispatcher rejects (permissions, usage) is turned into response text
/// and never surfaces as a `ShellError`.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("missing handler, path={0}")]
    UnknownPath(String),

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Invalid buffer size '{0}'")]
    InvalidBufferSize(String),

    #[error("Buffer size mismatch: expected {expected}, peer acknowledged {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("User command received before the buffer size was synchronized")]
    NotSynced,

    #[error("Connection closed by peer: {0}")]
    ClosedByPeer(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Internal Error: {0}")]
    Internal(String),
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ShellError {
    fn clone(&self) -> Self {
        match self {
            ShellError::Io(e) => ShellError::Io(Arc::clone(e)),
            ShellError::Protocol(s) => ShellError::Protocol(s.clone()),
            ShellError::UnknownPath(s) => ShellError::UnknownPath(s.clone()),
            ShellError::MessageTooLarge { size, limit } => ShellError::MessageTooLarge {
                size: *size,
                limit: *limit,
            },
            ShellError::InvalidBufferSize(s) => ShellError::InvalidBufferSize(s.clone()),
            ShellError::BufferSizeMismatch { expected, actual } => {
                ShellError::BufferSizeMismatch {
                    expected: *expected,
                    actual: *actual,
                }
            }
            ShellError::NotSynced => ShellError::NotSynced,
            ShellError::ClosedByPeer(s) => ShellError::ClosedByPeer(s.clone()),
            ShellError::InvalidAddress(s) => ShellError::InvalidAddress(s.clone()),
            ShellError::Internal(s) => ShellError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ShellError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ShellError::Io(e1), ShellError::Io(e2)) => e1.kind() == e2.kind(),
            (ShellError::Protocol(s1), ShellError::Protocol(s2)) => s1 == s2,
            (ShellError::UnknownPath(s1), ShellError::UnknownPath(s2)) => s1 == s2,
            (
                ShellError::MessageTooLarge { size: s1, limit: l1 },
                ShellError::MessageTooLarge { size: s2, limit: l2 },
            ) => s1 == s2 && l1 == l2,
            (ShellError::InvalidBufferSize(s1), ShellError::InvalidBufferSize(s2)) => s1 == s2,
            (
                ShellError::BufferSizeMismatch {
                    expected: e1,
                    actual: a1,
                },
                ShellError::BufferSizeMismatch {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (ShellError::ClosedByPeer(s1), ShellError::ClosedByPeer(s2)) => s1 == s2,
            (ShellError::InvalidAddress(s1), ShellError::InvalidAddress(s2)) => s1 == s2,
            (ShellError::Internal(s1), ShellError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl ShellError {
    /// True for the transport errors that simply mean the peer went away.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, ShellError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }

    /// A short, stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ShellError::Io(_) => "io",
            ShellError::Protocol(_) => "protocol",
            ShellError::UnknownPath(_) => "unknown_path",
            ShellError::MessageTooLarge { .. } => "message_too_large",
            ShellError::InvalidBufferSize(_) => "invalid_buffer_size",
            ShellError::BufferSizeMismatch { .. } => "buffer_size_mismatch",
            ShellError::NotSynced => "not_synced",
            ShellError::ClosedByPeer(_) => "closed_by_peer",
            ShellError::InvalidAddress(_) => "invalid_address",
            ShellError::Internal(_) => "internal",
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ShellError {
    fn from(e: std::io::Error) -> Self {
        ShellError::Io(Arc::new(e))
    }
}
