//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Dispatcher                         │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► ApiError ──► Response   │
//! │                                                                         │
//! │  ErrorKind            HTTP status   code                                │
//! │  ─────────            ───────────   ────                                │
//! │  NotFound             404           NOT_FOUND                           │
//! │  InvalidInput         400           INVALID_INPUT                       │
//! │  Conflict             409           CONFLICT                            │
//! │  Forbidden            403           FORBIDDEN                           │
//! │  PreconditionFailed   412           PRECONDITION_FAILED                 │
//! │  Unauthenticated      401           UNAUTHENTICATED                     │
//! │  (infrastructure)     500           INTERNAL  (details only in logs)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "PRECONDITION_FAILED",
//!   "tag": "item_frozen",
//!   "message": "Item 17 is frozen"
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bazaar_core::{CoreError, ErrorKind, ValidationError};
use bazaar_db::DbError;
use serde::Serialize;
use tracing::error;

/// API error returned from route handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Finer-grained variant, e.g. `item_frozen`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'static str>,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Malformed or invalid input (400)
    InvalidInput,

    /// Conflicts with existing state (409)
    Conflict,

    /// Role lacks the capability, or data belongs to someone else (403)
    Forbidden,

    /// Item state forbids the operation (412)
    PreconditionFailed,

    /// Missing, unknown or expired session, or wrong credentials (401)
    Unauthenticated,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::Forbidden => ErrorCode::Forbidden,
            ErrorKind::PreconditionFailed => ErrorCode::PreconditionFailed,
            ErrorKind::Unauthenticated => ErrorCode::Unauthenticated,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            tag: None,
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidInput, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError {
            code: err.kind().into(),
            tag: Some(err.tag()),
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err).into()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            other => match other.kind() {
                Some(kind) => ApiError::new(kind.into(), other.to_string()),
                None => {
                    error!(error = %other, "Store operation failed");
                    ApiError::internal("Internal server error")
                }
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Result type for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (CoreError::NoSuchItem(1), StatusCode::NOT_FOUND),
            (CoreError::NoSuchSession, StatusCode::UNAUTHORIZED),
            (CoreError::WrongPassword, StatusCode::UNAUTHORIZED),
            (CoreError::SaleRequiresCashier(2), StatusCode::FORBIDDEN),
            (CoreError::HiddenFrozenItem(3), StatusCode::CONFLICT),
            (CoreError::ItemFrozen(3), StatusCode::PRECONDITION_FAILED),
            (
                CoreError::Validation(ValidationError::InvalidPrice(0)),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_db_errors() {
        let err = ApiError::from(DbError::Domain(CoreError::ItemFrozen(9)));
        assert_eq!(err.code, ErrorCode::PreconditionFailed);
        assert_eq!(err.tag, Some("item_frozen"));

        let err = ApiError::from(DbError::duplicate("item_categories.name", "Toys"));
        assert_eq!(err.code, ErrorCode::Conflict);

        // Infrastructure details stay out of the response
        let err = ApiError::from(DbError::QueryFailed("disk I/O error".into()));
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(ApiError::from(CoreError::ItemHidden(4))).unwrap();
        assert_eq!(json["code"], "PRECONDITION_FAILED");
        assert_eq!(json["tag"], "item_hidden");
        assert_eq!(json["message"], "Item 4 is hidden");

        let json = serde_json::to_value(ApiError::internal("boom")).unwrap();
        assert!(json.get("tag").is_none());
    }
}
