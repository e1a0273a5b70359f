//! Error types for WebSocket operations.

use thiserror::Error;

/// WebSocket error type.
#[derive(Debug, Error)]
pub enum WsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame payload above the configured maximum
    #[error("Frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: u64, max: usize },

    /// Text frame that is not valid UTF-8
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Handshake request too large or malformed
    #[error("Handshake error: {0}")]
    Handshake(String),
}

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;
