//! Newline framing for the text protocol.
//!
//! Data read from a socket can end in the middle of a line. `LineReader`
//! keeps the partial tail buffered until its `\n` arrives and hands out
//! each complete line exactly once.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::ProtocolError;

/// Longest line a peer may send before the buffer is discarded.
pub const MAX_LINE_LENGTH: usize = 4096;

/// A reader that splits a byte stream into lines.
#[derive(Debug)]
pub struct LineReader {
    buf: BytesMut,
    max_len: usize,
}

impl LineReader {
    /// Create a reader with the default line limit.
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a reader that rejects lines longer than `max_len` bytes.
    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            max_len,
        }
    }

    /// Append freshly received bytes.
    #[inline]
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete line, without its `\n` (or `\r\n`).
    ///
    /// Returns `None` when only a partial line is buffered.
    pub fn next_line(&mut self) -> Option<Result<String, ProtocolError>> {
        match self.buf.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                let line = self.buf.split_to(idx + 1);
                let mut bytes = &line[..idx];
                if let Some(stripped) = bytes.strip_suffix(b"\r") {
                    bytes = stripped;
                }
                Some(
                    std::str::from_utf8(bytes)
                        .map(str::to_owned)
                        .map_err(|_| ProtocolError::InvalidUtf8),
                )
            }
            None if self.buf.len() > self.max_len => {
                self.buf.clear();
                Some(Err(ProtocolError::LineTooLong(self.max_len)))
            }
            None => None,
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

/// A writer that builds a block of newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineWriter {
    buf: BytesMut,
}

impl LineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append `text` followed by `\n`.
    pub fn put_line(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.put_u8(b'\n');
    }

    /// Append `value` as one line of JSON.
    pub fn put_json<T: Serialize>(&mut self, value: &T) -> Result<(), ProtocolError> {
        serde_json::to_writer((&mut self.buf).writer(), value)?;
        self.buf.put_u8(b'\n');
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the written lines into a cheaply clonable buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
