//! Newline-delimited JSON envelope framing.
//!
//! Every message is a single JSON object on its own line:
//! `{"type": "...", "data": {...}}`, optionally with extra top-level fields.
//! Malformed lines are reported per line and never poison the stream.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::EnvelopeCodec;
pub use codec::{
    decode_envelope, encode_line, is_blank, FrameConfig, LineDecoder, DEFAULT_MAX_LINE,
};
pub use envelope::Envelope;
pub use error::{FrameError, Result};
pub use kind::{
    MessageKind, BROADCAST, CHECK_PERMISSION, COMMAND, EXECUTE, PERMISSION_RESULT, PLAYER_ACTION,
    REGISTER_COMMAND,
};
pub use reader::LineReader;
pub use writer::LineWriter;
