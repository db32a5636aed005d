use thiserror::Error;

/// Main error type for livesync
///
/// None of these ever reach a subscriber. The manager recovers from
/// transport errors locally and drops undecodable frames; the variants
/// exist so the seams (codec, connector, config) can report what happened.
#[derive(Error, Debug)]
pub enum SyncError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connect attempt did not resolve in time
    #[error("Connect attempt timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    /// Inbound frame could not be decoded into an event
    #[error("Decode error: {0}")]
    Decode(String),

    /// Outbound message could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

/// Result type for livesync operations
pub type Result<T> = std::result::Result<T, SyncError>;
