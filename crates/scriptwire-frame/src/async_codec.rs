//! `tokio_util::codec` adapter for envelope lines.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_envelope, encode_line, is_blank, FrameConfig, LineDecoder};
use crate::envelope::Envelope;
use crate::error::FrameError;

/// Line codec for `FramedRead`/`FramedWrite`.
///
/// Per-line decode failures are yielded as `Ok(Some(Err(..)))` so a bad line
/// doesn't end the stream; only I/O errors terminate it.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    lines: LineDecoder,
}

impl EnvelopeCodec {
    /// Create a codec with explicit framing configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            lines: LineDecoder::new(config.max_line_length),
        }
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Result<Envelope, FrameError>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode(src) {
                Ok(Some(line)) if is_blank(&line) => continue,
                Ok(Some(line)) => return Ok(Some(decode_envelope(&line))),
                Ok(None) => return Ok(None),
                Err(err) => return Ok(Some(Err(err))),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode_eof(src) {
                Ok(Some(line)) if is_blank(&line) => continue,
                Ok(Some(line)) => return Ok(Some(decode_envelope(&line))),
                Ok(None) => return Ok(None),
                Err(err) => return Ok(Some(Err(err))),
            }
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_line(&item, dst)
    }
}
