use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{decode_envelope, is_blank, FrameConfig, LineDecoder};
use crate::envelope::Envelope;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads newline-delimited envelopes from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete lines.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: LineDecoder,
    config: FrameConfig,
    eof: bool,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: LineDecoder::new(config.max_line_length),
            config,
            eof: false,
        }
    }

    /// Read the next non-blank line (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// final line without a terminator is still returned before that.
    pub fn read_line(&mut self) -> Result<Bytes> {
        loop {
            let next = if self.eof {
                self.decoder.decode_eof(&mut self.buf)?
            } else {
                self.decoder.decode(&mut self.buf)?
            };

            match next {
                Some(line) if is_blank(&line) => continue,
                Some(line) => return Ok(line),
                None if self.eof => return Err(FrameError::ConnectionClosed),
                None => {}
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                continue;
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read and decode the next envelope.
    ///
    /// A malformed line surfaces as a decode error (see
    /// [`FrameError::is_decode_error`]); the reader stays usable.
    pub fn read_envelope(&mut self) -> Result<Envelope> {
        let line = self.read_line()?;
        decode_envelope(&line)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::kind::MessageKind;

    #[test]
    fn read_single_envelope() {
        let wire = b"{\"type\":\"command\",\"data\":{\"command\":\"heal\"}}\n".to_vec();
        let mut reader = LineReader::new(Cursor::new(wire));

        let env = reader.read_envelope().unwrap();
        assert_eq!(env.kind(), Some(MessageKind::Command));
        assert!(matches!(
            reader.read_envelope(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn skips_blank_lines() {
        let wire = b"\n   \n{\"type\":\"command\"}\n\n".to_vec();
        let mut reader = LineReader::new(Cursor::new(wire));

        assert_eq!(reader.read_line().unwrap().as_ref(), b"{\"type\":\"command\"}");
        assert!(matches!(
            reader.read_line(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn malformed_line_does_not_poison_reader() {
        let wire = b"garbage\n{\"type\":\"permission_result\"}\n".to_vec();
        let mut reader = LineReader::new(Cursor::new(wire));

        let err = reader.read_envelope().unwrap_err();
        assert!(err.is_decode_error());

        let env = reader.read_envelope().unwrap();
        assert_eq!(env.kind(), Some(MessageKind::PermissionResult));
    }

    #[test]
    fn final_unterminated_line_is_returned() {
        let mut reader = LineReader::new(Cursor::new(b"{\"type\":\"command\"}".to_vec()));
        assert!(reader.read_envelope().is_ok());
        assert!(matches!(
            reader.read_line(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: b"{\"type\":\"command\"}\n".to_vec(),
            pos: 0,
        };
        let mut reader = LineReader::new(byte_reader);

        let env = reader.read_envelope().unwrap();
        assert_eq!(env.msg_type, "command");
    }

    #[test]
    fn oversized_line_then_recovery() {
        let cfg = FrameConfig {
            max_line_length: 16,
        };
        let mut wire = vec![b'x'; 64];
        wire.extend_from_slice(b"\n{\"type\":\"command\"}\n");
        let mut reader = LineReader::with_config(Cursor::new(wire), cfg);

        assert!(matches!(
            reader.read_line(),
            Err(FrameError::LineTooLong { size: 64, max: 16 })
        ));
        assert_eq!(reader.read_line().unwrap().as_ref(), b"{\"type\":\"command\"}");
    }

    #[test]
    fn empty_stream_is_closed() {
        let mut reader = LineReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_line(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        use crate::writer::LineWriter;

        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = LineWriter::new(left);
        let mut reader = LineReader::new(right);

        let sent = Envelope::new(MessageKind::Execute).field("command", "time set day");
        writer.send(&sent).unwrap();

        assert_eq!(reader.read_envelope().unwrap(), sent);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }
}
