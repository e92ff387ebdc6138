use serde_json::{json, Value};

/// Errors returned by relay operations.
///
/// `NotConnected` and `Timeout` are ordinary outcomes of a command, not
/// faults: callers surface them as an `error` field and may retry.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The connection is not in the `connected` state.
    #[error("Native messaging not connected")]
    NotConnected,

    /// No response arrived before the deadline.
    #[error("Timeout waiting for extension response")]
    Timeout(std::time::Duration),

    /// The inbound stream ended while the request was in flight.
    #[error("Connection to extension lost")]
    ConnectionLost,

    /// Frame-level error while writing the command.
    #[error("frame error: {0}")]
    Frame(#[from] axbridge_frame::FrameError),

    /// The reader loop was already started for this relay.
    #[error("reader already started")]
    AlreadyStarted,

    /// The reader thread could not be spawned.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(std::io::Error),
}

impl RelayError {
    /// True for outcomes a caller may retry without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::Timeout(_))
    }

    /// JSON body used by the facades: `{"error": "<message>"}`.
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeout_body_matches_wire_contract() {
        let err = RelayError::Timeout(Duration::from_millis(100));
        assert_eq!(
            err.to_json(),
            json!({"error": "Timeout waiting for extension response"})
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn not_connected_is_not_retryable() {
        let err = RelayError::NotConnected;
        assert_eq!(err.to_json()["error"], "Native messaging not connected");
        assert!(!err.is_retryable());
    }
}
