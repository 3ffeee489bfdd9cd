//! Error records and their classification

use std::fmt;

use chrono::{DateTime, Utc};
use resilink_request::RequestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category of a recorded error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A request reached the server and failed
    #[serde(rename = "api_error")]
    Api,
    /// The server could not be reached in time
    #[serde(rename = "network_error")]
    Network,
    /// The server reported an application-level failure
    #[serde(rename = "business_error")]
    Business,
    /// A panic or other local failure
    #[serde(rename = "runtime_error")]
    Runtime,
    /// Anything else
    #[serde(rename = "unknown_error")]
    Unknown,
}

impl ErrorKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api_error",
            Self::Network => "network_error",
            Self::Business => "business_error",
            Self::Runtime => "runtime_error",
            Self::Unknown => "unknown_error",
        }
    }

    /// Classify a request failure. Cancellations are not errors and yield `None`.
    pub fn classify(error: &RequestError) -> Option<Self> {
        match error {
            RequestError::Cancelled { .. } => None,
            RequestError::Connection(_) | RequestError::Timeout { .. } => Some(Self::Network),
            RequestError::Failed(_) if error.is_transient() => Some(Self::Network),
            RequestError::Business { .. } => Some(Self::Business),
            _ => Some(Self::Api),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured error, as delivered to the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error category, serialized as `type`
    #[serde(rename = "type")]
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// Capture time (UTC, RFC 3339)
    pub timestamp: DateTime<Utc>,

    /// Application status code, for business errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    /// HTTP status, for API errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Endpoint the failing request targeted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Caller-supplied context
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl ErrorRecord {
    /// Create a record stamped with the current time
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            code: None,
            status: None,
            endpoint: None,
            context: Map::new(),
        }
    }

    /// Build a record for a failed request, or `None` for a cancellation.
    ///
    /// A string `endpoint` entry in `context` is lifted into
    /// [`endpoint`](Self::endpoint).
    pub fn from_request_error(error: &RequestError, mut context: Map<String, Value>) -> Option<Self> {
        let kind = ErrorKind::classify(error)?;
        let mut record = Self::new(kind, error.to_string());

        match error {
            RequestError::Business { code, .. } => record.code = Some(*code),
            RequestError::Status { status, .. } => record.status = Some(*status),
            _ => {}
        }
        if let Some(Value::String(endpoint)) = context.remove("endpoint") {
            record.endpoint = Some(endpoint);
        }
        record.context = context;

        Some(record)
    }

    /// Set the application status code
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add one context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Merge a context map, overwriting existing keys
    pub fn with_context_map(mut self, context: Map<String, Value>) -> Self {
        self.context.extend(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(serde_json::to_value(ErrorKind::Api).unwrap(), json!("api_error"));
        assert_eq!(
            serde_json::to_value(ErrorKind::Network).unwrap(),
            json!("network_error")
        );
        assert_eq!(ErrorKind::Business.to_string(), "business_error");
        assert_eq!(ErrorKind::Runtime.as_str(), "runtime_error");
        assert_eq!(
            serde_json::from_value::<ErrorKind>(json!("unknown_error")).unwrap(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            ErrorKind::classify(&RequestError::Connection("refused".into())),
            Some(ErrorKind::Network)
        );
        assert_eq!(
            ErrorKind::classify(&RequestError::failed("Network Error")),
            Some(ErrorKind::Network)
        );
        assert_eq!(
            ErrorKind::classify(&RequestError::Timeout {
                timeout: Duration::from_secs(1)
            }),
            Some(ErrorKind::Network)
        );
        assert_eq!(
            ErrorKind::classify(&RequestError::Business {
                code: 400,
                message: "invalid".into()
            }),
            Some(ErrorKind::Business)
        );
        assert_eq!(
            ErrorKind::classify(&RequestError::Status {
                status: 500,
                message: "Internal Server Error".into()
            }),
            Some(ErrorKind::Api)
        );
        assert_eq!(ErrorKind::classify(&RequestError::failed("boom")), Some(ErrorKind::Api));
        assert_eq!(
            ErrorKind::classify(&RequestError::Cancelled { reason: None }),
            None
        );
    }

    #[test]
    fn test_record_from_request_error_lifts_endpoint() {
        let context = json!({"endpoint": "/api/orders/", "page": 2});
        let Value::Object(context) = context else {
            unreachable!()
        };
        let record = ErrorRecord::from_request_error(
            &RequestError::Business {
                code: 4001,
                message: "stock exhausted".into(),
            },
            context,
        )
        .unwrap();

        assert_eq!(record.kind, ErrorKind::Business);
        assert_eq!(record.code, Some(4001));
        assert_eq!(record.endpoint.as_deref(), Some("/api/orders/"));
        assert_eq!(record.context.get("page"), Some(&json!(2)));
        assert!(!record.context.contains_key("endpoint"));
    }

    #[test]
    fn test_record_serializes_compactly() {
        let record = ErrorRecord::new(ErrorKind::Api, "HTTP 502: Bad Gateway").with_status(502);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "api_error");
        assert_eq!(value["status"], 502);
        assert!(value.get("code").is_none());
        assert!(value.get("context").is_none());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
