//! # Validation Module
//!
//! Input validation utilities for Apotheca POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register command (Rust)                                      │
//! │  ├── Argument parsing (clap / FromStr)                                 │
//! │  └── THIS MODULE: field rules before any write                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart / checkout rules (cart.rs, checkout.rs)                 │
//! │  └── Stock snapshots, empty carts, refunds                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign keys (orders pin the products they sold)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::DiscountRate;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Highest discount an operator may enter (1000%).
pub const MAX_DISCOUNT_BPS: u32 = 100_000;

/// Largest quantity a single product record may hold.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ```rust
/// use apotheca_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Panadol 500mg").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a barcode.
///
/// ## Rules
/// - Digits only
/// - 6 to 14 characters (covers EAN-8, UPC-A, EAN-13, GTIN-14 and short
///   in-store codes)
///
/// An empty string is accepted and treated as "no barcode".
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Ok(());
    }

    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if barcode.len() < 6 {
        return Err(ValidationError::TooShort {
            field: "barcode".to_string(),
            min: 6,
        });
    }

    if barcode.len() > 14 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 14,
        });
    }

    Ok(())
}

/// True when a query looks like a scanned barcode rather than a name.
pub fn looks_like_barcode(query: &str) -> bool {
    let query = query.trim();
    query.len() >= 6 && query.chars().all(|c| c.is_ascii_digit())
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a login name.
///
/// ## Rules
/// - 3 to 32 characters
/// - Letters, digits, `.`, `-` and `_`
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 32,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, digits, '.', '-' and '_'".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }

    if password.chars().count() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in minor units.
///
/// ```rust
/// use apotheca_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("sale price", 500).is_ok());
/// assert!(validate_price_cents("sale price", 0).is_ok());     // free sample
/// assert!(validate_price_cents("sale price", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock quantity entered on a product record.
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount rate.
///
/// Rates above 100% are legal (they turn the sale into a refund); the cap
/// only catches typing accidents.
pub fn validate_discount(rate: DiscountRate) -> ValidationResult<()> {
    if rate.bps() > MAX_DISCOUNT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: i64::from(MAX_DISCOUNT_BPS / 100),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use apotheca_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
