//! Reporter error types.

use thiserror::Error;

/// A specialized `Result` type for error reporting.
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Errors raised while delivering error records to a collector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportError {
    /// The collector could not be reached.
    #[error("Report delivery failed: {0}")]
    Delivery(String),

    /// The collector answered with a non-success status.
    #[error("Collector at {endpoint} answered HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Endpoint the records were posted to
        endpoint: String,
    },

    /// Records could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The collector base URL is unusable.
    #[error("Invalid collector URL: {0}")]
    InvalidUrl(String),
}

impl ReportError {
    /// Whether delivering the same records again could succeed.
    ///
    /// Serialization and URL problems are local and permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Delivery(_) | Self::Status { .. })
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ReportError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => Self::Status {
                status: status.as_u16(),
                endpoint: url.to_string(),
            },
            _ => Self::Delivery(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ReportError::Delivery("refused".into()).is_retryable());
        assert!(
            ReportError::Status {
                status: 503,
                endpoint: "http://collector/api/system/errors/".into(),
            }
            .is_retryable()
        );
        assert!(!ReportError::Serialization("bad".into()).is_retryable());
        assert!(!ReportError::InvalidUrl("nope".into()).is_retryable());
    }

    #[test]
    fn test_status_display() {
        let err = ReportError::Status {
            status: 500,
            endpoint: "http://collector/api/system/errors/".into(),
        };
        assert_eq!(
            err.to_string(),
            "Collector at http://collector/api/system/errors/ answered HTTP 500"
        );
    }
}
