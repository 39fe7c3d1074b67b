use std::io::Write;
use std::sync::{Arc, Mutex};

use scriptwire_frame::{Envelope, LineWriter};

use crate::error::{BridgeError, Result};

type SharedWriter = Arc<Mutex<LineWriter<Box<dyn Write + Send>>>>;

/// Serialized access to the host-facing output stream.
///
/// Clones share one writer. Each `send` writes and flushes a whole line
/// while holding the lock, so lines from concurrent senders never interleave.
#[derive(Clone)]
pub struct Outbound {
    writer: SharedWriter,
}

impl Outbound {
    /// Wrap an output stream.
    pub fn new<W: Write + Send + 'static>(output: W) -> Self {
        let boxed: Box<dyn Write + Send> = Box::new(output);
        Self {
            writer: Arc::new(Mutex::new(LineWriter::new(boxed))),
        }
    }

    /// Write one envelope line and flush it.
    pub fn send(&self, envelope: &Envelope) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BridgeError::OutputPoisoned)?;
        writer.send(envelope)?;
        tracing::trace!(msg_type = %envelope.msg_type, "sent envelope");
        Ok(())
    }
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound").finish_non_exhaustive()
    }
}
