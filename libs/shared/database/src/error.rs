use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use shared_models::error::AppError;

use crate::retry::RetryableError;

/// PostgREST code for `.single()` requests that matched zero rows.
pub const NO_ROWS_CODE: &str = "PGRST116";
/// Postgres unique_violation.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Every failure the backend adapter can produce.
///
/// Classification into transient and terminal is decided here, at the
/// boundary, so callers never inspect error messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Backend unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("No rows found")]
    NoRows,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Builds the error for a non-success response from PostgREST or GoTrue.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let field = |key: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let code = field("code").or_else(|| field("error_code"));
        let error_tag = field("error");
        let message = field("message")
            .or_else(|| field("msg"))
            .or_else(|| field("error_description"))
            .or_else(|| error_tag.clone())
            .unwrap_or_else(|| body.to_string());

        match (status, code.as_deref(), error_tag.as_deref()) {
            (_, Some(NO_ROWS_CODE), _) => BackendError::NoRows,
            (_, Some(UNIQUE_VIOLATION_CODE), _) | (409, _, _) => BackendError::Conflict(message),
            (401 | 403, _, _) => BackendError::Auth(message),
            (_, Some("invalid_credentials"), _) | (_, _, Some("invalid_grant")) => {
                BackendError::Auth(message)
            }
            (502..=504, _, _) => BackendError::Unavailable { status, message },
            _ => BackendError::Api { status, code, message },
        }
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, BackendError::NoRows)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Conflict(_))
    }
}

impl RetryableError for BackendError {
    fn is_transient(&self) -> bool {
        match self {
            BackendError::Timeout(_)
            | BackendError::Network(_)
            | BackendError::Unavailable { .. } => true,
            BackendError::NoRows
            | BackendError::Auth(_)
            | BackendError::Conflict(_)
            | BackendError::Api { .. }
            | BackendError::Decode(_) => false,
        }
    }

    fn timed_out(limit: Duration) -> Self {
        BackendError::Timeout(limit)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout(_)
            | BackendError::Network(_)
            | BackendError::Unavailable { .. } => AppError::ServiceUnavailable(
                "The database is taking too long to respond. Please try again in a moment."
                    .to_string(),
            ),
            BackendError::NoRows => AppError::NotFound("Record not found".to_string()),
            BackendError::Auth(msg) => AppError::Auth(msg),
            BackendError::Conflict(msg) => AppError::Conflict(msg),
            BackendError::Api { .. } => AppError::Database(err.to_string()),
            BackendError::Decode(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_no_rows_code_is_terminal() {
        let err = BackendError::from_response(
            406,
            r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        assert_eq!(err, BackendError::NoRows);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = BackendError::from_response(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_matches!(err, BackendError::Conflict(ref m) if m.contains("duplicate key"));
        assert!(err.is_conflict());
        assert!(!err.is_no_rows());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_gateway_errors_are_transient() {
        for status in [502, 503, 504] {
            let err = BackendError::from_response(status, "upstream connect error");
            assert_matches!(err, BackendError::Unavailable { .. });
            assert!(err.is_transient());
        }
    }

    #[test]
    fn test_invalid_grant_maps_to_auth() {
        let err = BackendError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err, BackendError::Auth("Invalid login credentials".to_string()));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unknown_status_keeps_code() {
        let err = BackendError::from_response(400, r#"{"code":"22P02","message":"invalid input syntax for type uuid"}"#);
        assert_matches!(err, BackendError::Api { status: 400, code: Some(ref c), .. } if c == "22P02");
    }

    #[test]
    fn test_plain_text_body_becomes_message() {
        let err = BackendError::from_response(500, "boom");
        assert_matches!(err, BackendError::Api { ref message, .. } if message == "boom");
    }

    #[test]
    fn test_app_error_mapping() {
        assert_matches!(AppError::from(BackendError::Timeout(Duration::from_secs(30))), AppError::ServiceUnavailable(_));
        assert_matches!(AppError::from(BackendError::NoRows), AppError::NotFound(_));
        assert_matches!(AppError::from(BackendError::Auth("bad".into())), AppError::Auth(_));
        assert_matches!(AppError::from(BackendError::Conflict("dup".into())), AppError::Conflict(_));
    }
}
