// src/core/protocol/frame.rs

//! Implements the chunked framing that turns a raw byte stream into discrete
//! logical messages, as a `tokio_util::codec` `Encoder`/`Decoder` pair.
//!
//! A logical message is cut into chunks of at most `B` payload bytes, where `B`
//! is the connection's negotiated chunk size. Every chunk starts with a control
//! byte:
//!
//! - `0x00`: a continuation chunk, always exactly `B` payload bytes follow.
//! - `0xFF`: the terminal chunk, followed by a 4-byte big-endian length `n`
//!   (`n <= B`) and then `n` payload bytes.
//!
//! The explicit length on the terminal chunk is what lets the decoder find the
//! message boundary on a stream that preserves no read boundaries.
//!
//! This departs from a layout where every chunk, the terminal one included, is
//! a fixed `B + 1` bytes. Peers built for that layout cannot talk to this codec.

use super::message::Message;
use crate::core::ShellError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The chunk size both ends start with before negotiation.
pub const DEFAULT_BUF_SIZE: usize = 511;
/// Upper bound on a negotiated chunk size.
pub const MAX_BUF_SIZE: usize = 1024 * 1024;
/// Upper bound on one reassembled logical message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

const CONTINUATION: u8 = 0x00;
const TERMINAL: u8 = 0xFF;
const LEN_FIELD: usize = 4;
const TERMINAL_HEADER: usize = 1 + LEN_FIELD;

/// A codec carrying its own chunk size, so each connection can be switched to
/// the negotiated value independently of every other connection.
#[derive(Debug)]
pub struct ChunkCodec {
    chunk_size: usize,
    /// Payload of the continuation chunks already consumed for the message
    /// currently being reassembled.
    partial: BytesMut,
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_BUF_SIZE,
            partial: BytesMut::new(),
        }
    }
}

impl ChunkCodec {
    /// Creates a codec with an explicit chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self, ShellError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            chunk_size,
            partial: BytesMut::new(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Switches the chunk size. Only safe between messages, which is the case
    /// for the handshake since it runs before any multi-chunk traffic.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<(), ShellError> {
        validate_chunk_size(chunk_size)?;
        self.chunk_size = chunk_size;
        Ok(())
    }

    /// Encodes a raw logical message body into chunks.
    pub fn encode_raw(&self, body: &[u8], dst: &mut BytesMut) -> Result<(), ShellError> {
        if body.len() > MAX_MESSAGE_SIZE {
            return Err(ShellError::MessageTooLarge {
                size: body.len(),
                limit: MAX_MESSAGE_SIZE,
            });
        }

        let b = self.chunk_size;
        let chunks = chunk_count(body.len(), b);
        dst.reserve(body.len() + chunks + LEN_FIELD);

        let mut rest = body;
        while rest.len() > b {
            dst.put_u8(CONTINUATION);
            dst.put_slice(&rest[..b]);
            rest = &rest[b..];
        }
        dst.put_u8(TERMINAL);
        // `rest.len() <= b <= MAX_BUF_SIZE`, which always fits the length field.
        dst.put_u32(rest.len() as u32);
        dst.put_slice(rest);
        Ok(())
    }

    fn check_total(&self, incoming: usize) -> Result<(), ShellError> {
        let size = self.partial.len() + incoming;
        if size > MAX_MESSAGE_SIZE {
            return Err(ShellError::MessageTooLarge {
                size,
                limit: MAX_MESSAGE_SIZE,
            });
        }
        Ok(())
    }
}

/// The number of chunks a logical message of `len` bytes is cut into.
/// An empty message still travels as one terminal chunk.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size).max(1)
}

fn validate_chunk_size(chunk_size: usize) -> Result<(), ShellError> {
    if chunk_size == 0 || chunk_size > MAX_BUF_SIZE {
        return Err(ShellError::InvalidBufferSize(chunk_size.to_string()));
    }
    Ok(())
}

impl Encoder<Message> for ChunkCodec {
    type Error = ShellError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::with_capacity(item.encoded_len());
        item.write_body(&mut body);
        self.encode_raw(&body, dst)
    }
}

impl Decoder for ChunkCodec {
    type Item = Message;
    type Error = ShellError;

    /// Consumes as many complete chunks as `src` holds. Continuation payload is
    /// moved into `partial` right away, so a message larger than the socket
    /// buffer never has to sit in `src` as a whole.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(&control) = src.first() else {
                return Ok(None);
            };

            match control {
                CONTINUATION => {
                    let b = self.chunk_size;
                    if src.len() < 1 + b {
                        src.reserve(1 + b - src.len());
                        return Ok(None);
                    }
                    self.check_total(b)?;
                    self.partial.extend_from_slice(&src[1..1 + b]);
                    src.advance(1 + b);
                }
                TERMINAL => {
                    if src.len() < TERMINAL_HEADER {
                        return Ok(None);
                    }
                    let n = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
                    if n > self.chunk_size {
                        return Err(ShellError::Protocol(format!(
                            "terminal chunk of {n} bytes exceeds chunk size {}",
                            self.chunk_size
                        )));
                    }
                    self.check_total(n)?;
                    if src.len() < TERMINAL_HEADER + n {
                        src.reserve(TERMINAL_HEADER + n - src.len());
                        return Ok(None);
                    }
                    self.partial
                        .extend_from_slice(&src[TERMINAL_HEADER..TERMINAL_HEADER + n]);
                    src.advance(TERMINAL_HEADER + n);

                    let body = self.partial.split();
                    return Ok(Some(Message::parse(&body)));
                }
                other => {
                    return Err(ShellError::Protocol(format!(
                        "unrecognized control byte 0x{other:02x}"
                    )));
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None if buf.is_empty() && self.partial.is_empty() => Ok(None),
            None => Err(ShellError::Io(std::sync::Arc::new(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended in the middle of a message",
            )))),
        }
    }
}
