/// Errors that can occur in bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] scriptwire_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error outside of framing (thread spawn, stdio setup).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A command could not be registered.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The output stream is unusable after a panic while it was held.
    #[error("output stream lock poisoned")]
    OutputPoisoned,

    /// The dispatcher stopped while the host stream was still open.
    #[error("dispatcher stopped: {0}")]
    Disconnected(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure value returned by command handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of command handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;
