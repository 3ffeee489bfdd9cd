//! Request error types.

use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for decorated requests.
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Errors produced by request functions and the decorators wrapping them.
///
/// The type is `Clone` because coalescing decorators hand one outcome to
/// every waiting caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    /// The request failed for an unspecified, possibly transient reason.
    #[error("Request failed: {0}")]
    Failed(String),

    /// The remote endpoint could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response reason or body excerpt
        message: String,
    },

    /// The remote endpoint answered with an application-level failure code.
    #[error("Business error {code}: {message}")]
    Business {
        /// Application status code carried in the response envelope
        code: i64,
        /// Application message carried in the response envelope
        message: String,
    },

    /// The request did not settle before the configured timeout.
    #[error("Request timeout after {}ms", timeout.as_millis())]
    Timeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    Cancelled {
        /// Reason given when cancelling, if any
        reason: Option<String>,
    },

    /// Arguments or a response could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A decorator was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RequestError {
    /// Create a generic failure from any displayable value.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether this error is a caller-initiated cancellation.
    ///
    /// Calling code uses this to suppress user-facing reporting for
    /// intentionally aborted requests.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether this error was raised by a timeout racer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether retrying the request could plausibly succeed.
    ///
    /// Connection problems, timeouts, `5xx`/`408`/`429` statuses and failures
    /// whose message looks like a network fault are transient. Cancellation,
    /// business failures, `4xx` statuses and local errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Failed(message) => is_connection_error(message) || is_timeout_error(message),
            Self::Business { .. }
            | Self::Cancelled { .. }
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Internal(_) => false,
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Failed(format!("timed out: {err}"))
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            }
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Failed(err.to_string())
        }
    }
}

/// Check if an error message indicates a connection error
fn is_connection_error(error: &str) -> bool {
    let connection_patterns = [
        "connection refused",
        "connection reset",
        "connection timeout",
        "network error",
        "network unreachable",
        "host unreachable",
        "no route to host",
        "connection aborted",
        "broken pipe",
    ];

    let error_lower = error.to_lowercase();
    connection_patterns
        .iter()
        .any(|pattern| error_lower.contains(pattern))
}

/// Check if an error message indicates a timeout
fn is_timeout_error(error: &str) -> bool {
    let timeout_patterns = ["timeout", "timed out", "deadline exceeded"];

    let error_lower = error.to_lowercase();
    timeout_patterns
        .iter()
        .any(|pattern| error_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_includes_duration() {
        let err = RequestError::Timeout {
            timeout: Duration::from_millis(100),
        };
        assert_eq!(err.to_string(), "Request timeout after 100ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_cancelled_message() {
        let bare = RequestError::Cancelled { reason: None };
        assert_eq!(bare.to_string(), "Request cancelled");

        let with_reason = RequestError::Cancelled {
            reason: Some("user navigated away".to_string()),
        };
        assert_eq!(
            with_reason.to_string(),
            "Request cancelled: user navigated away"
        );
        assert!(with_reason.is_cancelled());
    }

    #[test]
    fn test_transient_classification() {
        assert!(RequestError::Connection("refused".into()).is_transient());
        assert!(RequestError::failed("Network Error").is_transient());
        assert!(RequestError::failed("upstream timed out").is_transient());
        assert!(!RequestError::failed("invalid json").is_transient());
        assert!(
            RequestError::Status {
                status: 503,
                message: "Service Unavailable".into()
            }
            .is_transient()
        );
        assert!(
            !RequestError::Status {
                status: 404,
                message: "Not Found".into()
            }
            .is_transient()
        );
        assert!(!RequestError::Cancelled { reason: None }.is_transient());
    }
}
