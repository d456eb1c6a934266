//! Error types for the Datalab SDK.
//!
//! Batch processing converts any of these into a failed item result at the
//! item boundary; single-document calls surface them directly.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by SDK operations.
#[derive(Debug, Error)]
pub enum DatalabError {
    /// The API rejected a request or reported a failed job.
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code, when the error came from a status response.
        status_code: Option<u16>,
        /// Raw response body, when one was available.
        response: Option<serde_json::Value>,
    },

    /// Polling exhausted its budget without reaching a terminal status.
    #[error("polling timed out after {attempts} attempts ({budget:?} total)")]
    Timeout { attempts: usize, budget: Duration },

    /// A local source file could not be read.
    #[error("file error for {path}: {message}")]
    File { path: String, message: String },

    /// Caller input was malformed or unsupported.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatalabError {
    /// Build an API error from a message alone.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: None,
            response: None,
        }
    }

    /// Build an API error carrying the HTTP status and response body.
    pub fn api_with_response(
        message: impl Into<String>,
        status_code: u16,
        response: Option<serde_json::Value>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            status_code: Some(status_code),
            response,
        }
    }

    /// Build a file error for a path.
    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The `error` field from the API response body, if one was captured.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api {
                response: Some(body),
                ..
            } => Some(body.get("error").unwrap_or(body)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DatalabError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                attempts: 1,
                budget: Duration::ZERO,
            };
        }
        Self::Api {
            message: format!("Request failed: {}", err),
            status_code: err.status().map(|s| s.as_u16()),
            response: None,
        }
    }
}

/// Result alias used throughout the SDK.
pub type Result<T> = std::result::Result<T, DatalabError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_prefers_error_field() {
        let err = DatalabError::api_with_response(
            "bad request",
            400,
            Some(json!({"error": "unsupported file type", "success": false})),
        );
        assert_eq!(err.details(), Some(&json!("unsupported file type")));
    }

    #[test]
    fn test_details_falls_back_to_body() {
        let err =
            DatalabError::api_with_response("bad request", 400, Some(json!({"detail": "nope"})));
        assert_eq!(err.details(), Some(&json!({"detail": "nope"})));
    }

    #[test]
    fn test_details_absent_without_response() {
        assert!(DatalabError::api("boom").details().is_none());
        assert!(DatalabError::Validation("bad".into()).details().is_none());
    }

    #[test]
    fn test_display_includes_message() {
        let err = DatalabError::api("rate limit exceeded");
        assert!(err.to_string().contains("rate limit exceeded"));
    }
}
