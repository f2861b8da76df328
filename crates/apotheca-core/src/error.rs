//! # Error Types
//!
//! Domain-specific error types for apotheca-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  apotheca-core errors (this file)                                      │
//! │  ├── CoreError         - Cart / checkout rule violations               │
//! │  ├── ValidationError   - Input validation failures                     │
//! │  └── PersistenceError  - What an OrderStore reports on failure         │
//! │                                                                         │
//! │  apotheca-db errors (separate crate)                                   │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  Register errors (in app)                                              │
//! │  └── ApiError          - What the operator sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Operator               │
//! │        DbError → PersistenceError → CoreError::Persistence             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is recoverable by the operator. None of them leave a
//! cart half-modified.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product with no stock on hand was added to a cart.
    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    /// Requested quantity exceeds the stock snapshot held by the cart line.
    ///
    /// ## User Workflow
    /// ```text
    /// Set quantity (qty: 12)
    ///      │
    ///      ▼
    /// Check snapshot: stock=10
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Panadol", available: 10, requested: 12 }
    ///      │
    ///      ▼
    /// Operator sees: "Only 10 Panadol in stock"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Checkout was requested on a cart with no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order store failed to commit the order.
    #[error("Failed to commit order: {0}")]
    Persistence(#[from] PersistenceError),

    /// A checkout is already committing on this register.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,

    /// The logged-in user lacks the role an operation needs.
    #[error("{action} requires the {required} role")]
    Unauthorized { action: String, required: String },

    /// Too many carts are open on one register.
    #[error("Cannot open more than {max} carts")]
    TooManyCarts { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Persistence Error
// =============================================================================

/// Failure reported by an [`OrderStore`](crate::checkout::OrderStore).
///
/// Carries the store's own message verbatim; the checkout engine adds the
/// context when it wraps it into [`CoreError::Persistence`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PersistenceError {
    pub message: String,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        PersistenceError {
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, non-digit barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
