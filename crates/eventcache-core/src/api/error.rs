use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by the remote store and the query cache.
///
/// Cloneable so one failed fetch can be handed to every caller sharing it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("Validation failed: {}", summarize(.field_errors))]
    Validation {
        message: Option<String>,
        field_errors: BTreeMap<String, String>,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape used by the events backend. All fields optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

fn summarize(field_errors: &BTreeMap<String, String>) -> String {
    if field_errors.is_empty() {
        return "invalid input".to_string();
    }
    field_errors
        .iter()
        .map(|(field, msg)| format!("{}: {}", field, msg))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                // Plain-text bodies still carry something worth showing.
                let trimmed = body.trim();
                (!trimmed.is_empty() && !trimmed.starts_with('{'))
                    .then(|| Self::truncate_body(trimmed))
            });

        match status {
            404 => ApiError::NotFound(message.unwrap_or_else(|| "no such event".to_string())),
            422 => ApiError::Validation {
                message,
                field_errors: parsed.errors,
            },
            400 if !parsed.errors.is_empty() => ApiError::Validation {
                message,
                field_errors: parsed.errors,
            },
            _ => ApiError::Server { status, message },
        }
    }

    /// Reads may be retried on transient failures. Mutations never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// The most specific human-readable message the server provided, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } | ApiError::Validation { message, .. } => {
                message.as_deref()
            }
            ApiError::NotFound(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Server {
                status: status.as_u16(),
                message: None,
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_not_found() {
        let err = ApiError::from_status(404, r#"{"message": "Event not found"}"#);
        assert_eq!(err, ApiError::NotFound("Event not found".to_string()));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_status_validation_with_field_errors() {
        let body = r#"{"message": "Invalid data", "errors": {"title": "Title is required"}}"#;
        let err = ApiError::from_status(422, body);
        match &err {
            ApiError::Validation { message, field_errors } => {
                assert_eq!(message.as_deref(), Some("Invalid data"));
                assert_eq!(field_errors.get("title").map(String::as_str), Some("Title is required"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(err.to_string(), "Validation failed: title: Title is required");

        // 400 without field errors stays a plain server error
        let err = ApiError::from_status(400, r#"{"message": "bad"}"#);
        assert!(matches!(err, ApiError::Server { status: 400, .. }));
    }

    #[test]
    fn test_from_status_plain_text_body() {
        let err = ApiError::from_status(503, "upstream unavailable");
        assert_eq!(err.server_message(), Some("upstream unavailable"));
        assert!(err.is_retryable());

        let err = ApiError::from_status(500, "");
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 510 total bytes)"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Network("reset".into()).is_retryable());
        assert!(!ApiError::NotFound("x".into()).is_retryable());
        assert!(!ApiError::Cancelled.is_retryable());
        assert!(!ApiError::Server { status: 403, message: None }.is_retryable());
    }
}
