//! # API Error Type
//!
//! Unified error type for register commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Apotheca POS                           │
//! │                                                                         │
//! │  Command Function                                                      │
//! │  Result<T, ApiError>                                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Database Error? ─── DbError::Referenced {..} ─────┐                   │
//! │         │                                          │                   │
//! │         ▼                                          ▼                   │
//! │  Business Error? ─── CoreError::EmptyCart ─────── ApiError ──► shell   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Success ──────────────────────────────────────────────────► shell     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error carries a machine-readable `code` and a message the operator
//! can act on. Internal failures are logged in full and shown generically.

use apotheca_core::CoreError;
use apotheca_db::DbError;
use serde::Serialize;

/// API error returned from register commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Panadol: available 3, requested 4"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Duplicate username, formula, ...
    AlreadyExists,

    /// Row still referenced elsewhere (e.g. a sold product)
    InUse,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,

    /// Cart operation failed
    CartError,

    /// Product has no stock on hand
    OutOfStock,

    /// Insufficient stock
    InsufficientStock,

    /// Checkout on an empty cart
    EmptyCart,

    /// Another checkout is committing on this register
    CheckoutInProgress,

    /// The order store rejected the commit
    CommitFailed,

    /// No one is logged in
    NotLoggedIn,

    /// Logged-in user lacks the required role
    Forbidden,

    /// Wrong username or password
    InvalidCredentials,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn not_logged_in() -> Self {
        ApiError::new(ErrorCode::NotLoggedIn, "Log in first")
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::AlreadyExists,
                format!("{} '{}' already exists", field, value),
            ),
            err @ DbError::Referenced { .. } => ApiError::new(ErrorCode::InUse, err.to_string()),
            DbError::Validation(e) => ApiError::validation(e.to_string()),
            DbError::InvalidCredentials => {
                ApiError::new(ErrorCode::InvalidCredentials, "Invalid username or password")
            }
            DbError::PasswordHash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal("Password could not be processed")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::OutOfStock { .. } => ErrorCode::OutOfStock,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::Persistence(_) => ErrorCode::CommitFailed,
            CoreError::CheckoutInProgress => ErrorCode::CheckoutInProgress,
            CoreError::Unauthorized { .. } => ErrorCode::Forbidden,
            CoreError::TooManyCarts { .. } => ErrorCode::CartError,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, message)
    }
}

impl From<apotheca_core::ValidationError> for ApiError {
    fn from(err: apotheca_core::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for register commands.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use apotheca_core::PersistenceError;

    #[test]
    fn test_core_errors_keep_their_message() {
        let err = ApiError::from(CoreError::InsufficientStock {
            name: "Panadol".to_string(),
            available: 3,
            requested: 4,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Insufficient stock for Panadol: available 3, requested 4"
        );

        let err = ApiError::from(CoreError::Persistence(PersistenceError::new(
            "database is locked",
        )));
        assert_eq!(err.code, ErrorCode::CommitFailed);
        assert_eq!(err.message, "Failed to commit order: database is locked");
    }

    #[test]
    fn test_referenced_product_is_in_use() {
        let err = ApiError::from(DbError::Referenced {
            entity: "Product".to_string(),
            id: "p-1".to_string(),
            referenced_by: "past orders".to_string(),
        });
        assert_eq!(err.code, ErrorCode::InUse);
        assert_eq!(err.message, "Product p-1 is referenced by past orders");
    }

    #[test]
    fn test_query_failure_is_generic() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serializes_screaming_code() {
        let json = serde_json::to_value(ApiError::not_logged_in()).unwrap();
        assert_eq!(json["code"], "NOT_LOGGED_IN");
    }
}
