/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The line is not valid JSON.
    #[error("invalid JSON line: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("envelope must be a JSON object")]
    NotAnObject,

    /// The envelope has no string `type` field.
    #[error("envelope is missing a string \"type\" field")]
    MissingType,

    /// The line exceeds the configured maximum length.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// The envelope payload could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// An I/O error occurred while reading or writing lines.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end-of-file.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors caused by a single bad inbound line.
    ///
    /// A reader loop skips these and keeps going.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidJson(_)
                | FrameError::NotAnObject
                | FrameError::MissingType
                | FrameError::LineTooLong { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
