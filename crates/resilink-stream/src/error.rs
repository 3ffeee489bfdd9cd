//! Stream client error types.

use thiserror::Error;

/// A specialized `Result` type for stream operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Errors surfaced by the stream client, mostly through error listeners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection reported a transport error.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to write a frame to the connection.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The configured endpoint is not a usable WebSocket URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Automatic reconnection gave up.
    #[error("Reconnection abandoned after {attempts} attempts")]
    ReconnectExhausted {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Failed to serialize an outbound payload.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for StreamError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionLost(err.to_string())
    }
}
