use thiserror::Error;

/// Main error type for streamsockets
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Inbound frame could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for SocketError {
    fn from(e: serde_json::Error) -> Self {
        SocketError::Parse(e.to_string())
    }
}

/// Result type for streamsockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
