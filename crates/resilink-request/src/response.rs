//! The `{code, message, data, errors}` envelope returned by backend APIs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RequestError, RequestResult};

/// Envelope code signalling success
pub const SUCCESS_CODE: i64 = 200;

/// Standard API response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Application-level status; [`SUCCESS_CODE`] on success
    pub code: i64,
    /// Human-readable status message
    #[serde(default)]
    pub message: String,
    /// Payload, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Validation or field errors attached to a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl<T> ApiResponse<T> {
    /// A successful envelope around `data`
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data: Some(data),
            errors: None,
        }
    }

    /// A failed envelope
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    /// Whether the envelope reports success
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwrap the payload, turning a non-success code into
    /// [`RequestError::Business`].
    ///
    /// A success envelope without `data` yields `Ok(None)`.
    pub fn into_result(self) -> RequestResult<Option<T>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(RequestError::Business {
                code: self.code,
                message: self.message,
            })
        }
    }
}
