//! Streaming line framer.
//!
//! Transports deliver bytes in arbitrary chunks: a serial read can end in
//! the middle of a UTF-8 sequence, and a socket read can hold three lines and
//! half of a fourth.  [`LineDecoder`] buffers the tail, splits on `\n`, and
//! decodes each complete line independently.
//!
//! # Resynchronization
//!
//! A peer that never sends `\n` would grow the buffer without bound.  Once
//! the pending line exceeds `max_line_bytes` the decoder reports one
//! [`DecodeError::LineTooLong`], drops what it has, and skips everything up
//! to and including the next `\n`.  Decoding resumes with the line after it.

use tracing::warn;

use crate::protocol::codec::{decode_message, DecodeError};
use crate::protocol::messages::Message;

/// Default cap on a single line, large enough for layouts with embedded icons.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// How much of a rejected line is included in the warning log.
const LOG_PREVIEW_BYTES: usize = 120;

/// Incremental newline-delimited JSON decoder.
///
/// One instance per connection session.  The buffer is never reset because
/// of a decode error, so a corrupt line cannot damage the lines around it.
#[derive(Debug)]
pub struct LineDecoder {
    buf: Vec<u8>,
    max_line_bytes: usize,
    /// Set after an overflow until the next `\n` is seen.
    discarding: bool,
}

impl LineDecoder {
    /// Creates a decoder that rejects lines longer than `max_line_bytes`
    /// (excluding the terminator).
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Appends `chunk` and returns the outcome of every line it completed,
    /// in stream order.
    ///
    /// Blank lines are skipped.  A trailing `\r` is stripped so CRLF peers
    /// work unchanged.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Message, DecodeError>> {
        let mut out = Vec::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            match rest.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    let head = &rest[..pos];
                    rest = &rest[pos + 1..];

                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if self.buf.len() + head.len() > self.max_line_bytes {
                        self.buf.clear();
                        out.push(Err(self.overflow()));
                        continue;
                    }
                    self.buf.extend_from_slice(head);
                    let line = std::mem::take(&mut self.buf);
                    if let Some(result) = Self::decode_line(&line) {
                        out.push(result);
                    }
                }
                None => {
                    if self.discarding {
                        break;
                    }
                    if self.buf.len() + rest.len() > self.max_line_bytes {
                        self.buf.clear();
                        self.discarding = true;
                        out.push(Err(self.overflow()));
                        break;
                    }
                    self.buf.extend_from_slice(rest);
                    break;
                }
            }
        }
        out
    }

    /// Bytes of an incomplete line currently held.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the decoder is skipping the remainder of an oversized line.
    pub fn is_resynchronizing(&self) -> bool {
        self.discarding
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    fn overflow(&self) -> DecodeError {
        warn!("discarding line longer than {} bytes", self.max_line_bytes);
        DecodeError::LineTooLong {
            limit: self.max_line_bytes,
        }
    }

    fn decode_line(line: &[u8]) -> Option<Result<Message, DecodeError>> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        let result = decode_message(line);
        if let Err(e) = &result {
            let preview = &line[..line.len().min(LOG_PREVIEW_BYTES)];
            warn!(
                "dropping undecodable line ({e}): {}",
                String::from_utf8_lossy(preview)
            );
        }
        Some(result)
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
