use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::envelope::Envelope;
use crate::error::{FrameError, Result};

/// Default maximum inbound line length: 1 MiB.
pub const DEFAULT_MAX_LINE: usize = 1024 * 1024;

/// Line terminator.
pub const NEWLINE: u8 = b'\n';

/// Configuration for line framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum inbound line length in bytes, excluding the terminator.
    pub max_line_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE,
        }
    }
}

/// Encode an envelope as one JSON line, terminator included.
///
/// serde_json escapes control characters inside strings, so the encoded
/// object never contains a raw newline.
pub fn encode_line(envelope: &Envelope, dst: &mut BytesMut) -> Result<()> {
    serde_json::to_writer((&mut *dst).writer(), envelope).map_err(FrameError::Encode)?;
    dst.put_u8(NEWLINE);
    Ok(())
}

/// Decode one line (terminator already removed) into an envelope.
pub fn decode_envelope(line: &[u8]) -> Result<Envelope> {
    let value: serde_json::Value = serde_json::from_slice(line).map_err(FrameError::InvalidJson)?;
    Envelope::from_value(value)
}

/// Returns true if the line holds nothing but ASCII whitespace.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Splits a byte buffer into lines.
///
/// An over-long line yields `FrameError::LineTooLong` once; the decoder then
/// discards input up to the next newline and resumes with the line after it.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    max_line_length: usize,
    discarding: bool,
}

impl LineDecoder {
    /// Create a decoder with the given line limit.
    pub fn new(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            discarding: false,
        }
    }

    /// Take the next complete line from `src`.
    ///
    /// Returns `Ok(None)` if the buffer doesn't contain a complete line yet.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if self.discarding {
            match find_newline(src) {
                Some(idx) => {
                    src.advance(idx + 1);
                    self.discarding = false;
                    tracing::trace!("resynchronized after oversized line");
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }
        }

        match find_newline(src) {
            Some(idx) => {
                if idx > self.max_line_length {
                    tracing::trace!(
                        size = idx,
                        max = self.max_line_length,
                        "skipping oversized line"
                    );
                    src.advance(idx + 1);
                    return Err(FrameError::LineTooLong {
                        size: idx,
                        max: self.max_line_length,
                    });
                }
                let mut line = src.split_to(idx + 1);
                line.truncate(idx);
                Ok(Some(strip_cr(line)))
            }
            None if src.len() > self.max_line_length => {
                let size = src.len();
                tracing::trace!(size, max = self.max_line_length, "discarding until next newline");
                src.clear();
                self.discarding = true;
                Err(FrameError::LineTooLong {
                    size,
                    max: self.max_line_length,
                })
            }
            None => Ok(None),
        }
    }

    /// Like [`decode`](Self::decode), but treats trailing bytes as a final
    /// unterminated line.
    pub fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if self.discarding {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        if src.is_empty() {
            return Ok(None);
        }
        let line = src.split_to(src.len());
        Ok(Some(strip_cr(line)))
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

fn find_newline(src: &[u8]) -> Option<usize> {
    src.iter().position(|b| *b == NEWLINE)
}

fn strip_cr(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}
