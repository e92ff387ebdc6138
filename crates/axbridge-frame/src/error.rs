/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared or actual payload length exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame.
    #[error("short read: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// The payload is not a valid UTF-8 JSON document.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// True when the error is a clean end-of-stream rather than a protocol fault.
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
