//! User-facing error notices.
//!
//! Views show a failed operation as a title plus the best message available:
//! the server's own message when it sent one, otherwise a generic fallback for
//! that view.

use std::collections::BTreeMap;
use std::fmt;

use crate::api::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    /// Per-field problems reported by the server, if any.
    pub field_errors: BTreeMap<String, String>,
}

impl ErrorNotice {
    pub fn new(title: impl Into<String>, err: &ApiError, fallback: &str) -> Self {
        let message = err
            .server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string();
        let field_errors = match err {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => BTreeMap::new(),
        };
        Self {
            title: title.into(),
            message,
            field_errors,
        }
    }

    pub fn create_failed(err: &ApiError) -> Self {
        Self::new(
            "Failed to create event",
            err,
            "Failed to create event, please check and try again.",
        )
    }

    pub fn load_failed(err: &ApiError) -> Self {
        Self::new(
            "Failed to load event",
            err,
            "Failed to load event. Please check your inputs and try again later.",
        )
    }

    pub fn details_failed(err: &ApiError) -> Self {
        Self::new("An error occurred", err, "Failed to fetch event details.")
    }

    pub fn list_failed(err: &ApiError) -> Self {
        Self::new("An error occurred", err, "Failed to fetch events.")
    }

    pub fn update_failed(err: &ApiError) -> Self {
        Self::new(
            "Failed to update event",
            err,
            "Failed to update event. Please check your inputs and try again later.",
        )
    }

    pub fn delete_failed(err: &ApiError) -> Self {
        Self::new(
            "Failed to delete event",
            err,
            "Failed to delete event, please try again later.",
        )
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)?;
        for (field, msg) in &self.field_errors {
            write!(f, "\n  - {}: {}", field, msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_uses_fallback() {
        let notice = ErrorNotice::details_failed(&ApiError::Network("timed out".into()));
        assert_eq!(notice.title, "An error occurred");
        assert_eq!(notice.message, "Failed to fetch event details.");
        assert_eq!(notice.to_string(), "An error occurred: Failed to fetch event details.");
    }

    #[test]
    fn test_server_message_wins() {
        let err = ApiError::from_status(404, r#"{"message": "Could not find event for id 9"}"#);
        let notice = ErrorNotice::load_failed(&err);
        assert_eq!(notice.message, "Could not find event for id 9");
    }

    #[test]
    fn test_blank_server_message_falls_back() {
        let err = ApiError::Server {
            status: 500,
            message: Some("   ".to_string()),
        };
        let notice = ErrorNotice::create_failed(&err);
        assert_eq!(notice.message, "Failed to create event, please check and try again.");
    }

    #[test]
    fn test_field_errors_are_listed() {
        let err = ApiError::from_status(
            422,
            r#"{"message": "Invalid data provided.", "errors": {"date": "Invalid date."}}"#,
        );
        let notice = ErrorNotice::create_failed(&err);
        assert_eq!(
            notice.to_string(),
            "Failed to create event: Invalid data provided.\n  - date: Invalid date."
        );
    }
}
