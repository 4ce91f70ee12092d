//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Rule violation (CoreError)          │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ← Domain(CoreError) or an infrastructure failure│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (bazaar-server) ← status code chosen from ErrorKind          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Client sees { code, message }                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Store operation errors.
///
/// Rule violations detected by the repositories travel as
/// [`DbError::Domain`]; everything else is an infrastructure failure.
#[derive(Debug, Error)]
pub enum DbError {
    /// A domain rule rejected the operation. No row was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a category name that already exists
    /// - Any UNIQUE index violation not caught by a pre-check
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation {
        field: String,
        value: String,
    },

    /// No usable connection: the file can't be opened, the pool is closed,
    /// or every connection stayed busy past the acquire timeout.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Runtime SQL error: CHECK or foreign key constraint, syntax, or a
    /// query that expected a row and got none.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Kind of the domain failure, `None` for infrastructure failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DbError::Domain(err) => Some(err.kind()),
            DbError::UniqueViolation { .. } => Some(ErrorKind::Conflict),
            _ => None,
        }
    }

    /// The wrapped domain error, if any.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Missing rows are reported by the repositories as domain errors before
/// sqlx ever sees them, so a stray `RowNotFound` is a query bug.
///
/// ```text
/// UNIQUE constraint failed: <table>.<column>  → UniqueViolation (409)
/// other database error (CHECK, FOREIGN KEY)   → QueryFailed
/// RowNotFound                                 → QueryFailed
/// PoolTimedOut, PoolClosed                    → ConnectionFailed
/// anything else                               → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::QueryFailed("query returned no row".to_string()),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                match msg.strip_prefix("UNIQUE constraint failed: ") {
                    Some(field) => DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    },
                    None => DbError::QueryFailed(msg.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("timed out waiting for a connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
