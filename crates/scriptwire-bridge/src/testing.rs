//! Shared I/O doubles for unit tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// In-memory sink whose contents stay readable after being moved into a writer.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    trickle: bool,
}

impl SharedBuffer {
    /// A sink that accepts one byte per `write` call.
    pub(crate) fn trickling() -> Self {
        Self {
            trickle: true,
            ..Self::default()
        }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.bytes.lock().unwrap();
        String::from_utf8(bytes.clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn envelopes(&self) -> Vec<scriptwire_frame::Envelope> {
        self.lines()
            .iter()
            .map(|line| scriptwire_frame::decode_envelope(line.as_bytes()).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let take = if self.trickle { buf.len().min(1) } else { buf.len() };
        self.bytes.lock().unwrap().extend_from_slice(&buf[..take]);
        Ok(take)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that always fails.
pub(crate) struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
