//! # Domain Types
//!
//! Core domain types used throughout Apotheca POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │    Formula      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  receipt_number │   │  name           │       │
//! │  │  category       │   │  total_cents    │   │  (generic drug) │       │
//! │  │  quantity       │   │  is_refund      │   └─────────────────┘       │
//! │  │  formula_id ────┼───┼─────────────────┼──►                          │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRate   │   │    Category     │   │    Settings     │       │
//! │  │  bps (u32)      │   │  Tablet, Syrup  │   │  auto_print     │       │
//! │  │  1000 = 10%     │   │  Injection ...  │   │  low_stock      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Orders copy product name and price at commit time. A later catalog edit
//! never rewrites history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::auth::Role;
use crate::error::ValidationError;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount percentage held in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%. Values above 10000 (100%) are
/// legal: operators use them to push a cart total negative and force a
/// refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a rate from a whole percentage (10 = 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        DiscountRate(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

/// Parses operator input such as `"10"`, `"12.5"` or `"7.25%"`.
///
/// ```rust
/// use apotheca_core::types::DiscountRate;
///
/// assert_eq!("12.5".parse::<DiscountRate>().unwrap().bps(), 1250);
/// assert_eq!("110%".parse::<DiscountRate>().unwrap().bps(), 11000);
/// assert!("-5".parse::<DiscountRate>().is_err());
/// ```
impl FromStr for DiscountRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "discount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim().trim_end_matches('%').trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "discount".to_string(),
            });
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must be a number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a non-negative number"));
        }

        let whole: u32 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("too large"))?
        };
        let frac: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().map_err(|_| invalid("must be a number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("must be a number"))?,
        };

        let rate = DiscountRate(
            whole
                .checked_mul(100)
                .and_then(|bps| bps.checked_add(frac))
                .ok_or_else(|| invalid("too large"))?,
        );
        validation::validate_discount(rate)?;
        Ok(rate)
    }
}

// =============================================================================
// Category
// =============================================================================

/// Dosage-form category of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tablet,
    Capsule,
    Syrup,
    Injection,
    Cream,
    Drops,
    Inhaler,
    Device,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Tablet,
        Category::Capsule,
        Category::Syrup,
        Category::Injection,
        Category::Cream,
        Category::Drops,
        Category::Inhaler,
        Category::Device,
        Category::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Tablet => "tablet",
            Category::Capsule => "capsule",
            Category::Syrup => "syrup",
            Category::Injection => "injection",
            Category::Cream => "cream",
            Category::Drops => "drops",
            Category::Inhaler => "inhaler",
            Category::Device => "device",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: Category::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product held in the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and on the receipt.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, ...). Not guaranteed unique.
    pub barcode: Option<String>,

    pub category: Category,

    /// Quantity on hand. Normally ≥ 0; a race between two registers can
    /// push it below zero.
    pub quantity: i64,

    /// Purchase (cost) price in minor units.
    pub purchase_price_cents: i64,

    /// Sale price in minor units.
    pub sale_price_cents: i64,

    pub description: Option<String>,

    /// Generic formula this product is a brand of.
    pub formula_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a new product from a validated draft.
    pub fn from_draft(id: String, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Product {
            id,
            name: draft.name.trim().to_string(),
            barcode: draft.barcode.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
            category: draft.category,
            quantity: draft.quantity,
            purchase_price_cents: draft.purchase_price_cents,
            sale_price_cents: draft.sale_price_cents,
            description: draft.description,
            formula_id: draft.formula_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    #[inline]
    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// True when stock is at or below `threshold`.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity <= threshold
    }
}

/// Input for creating or editing a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductDraft {
    pub name: String,
    pub barcode: Option<String>,
    pub category: Category,
    pub quantity: i64,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub description: Option<String>,
    pub formula_id: Option<String>,
}

impl ProductDraft {
    /// Runs every field validator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_product_name(&self.name)?;
        if let Some(barcode) = &self.barcode {
            validation::validate_barcode(barcode)?;
        }
        validation::validate_stock_quantity(self.quantity)?;
        validation::validate_price_cents("purchase price", self.purchase_price_cents)?;
        validation::validate_price_cents("sale price", self.sale_price_cents)?;
        if let Some(formula_id) = &self.formula_id {
            validation::validate_uuid(formula_id)?;
        }
        Ok(())
    }
}

// =============================================================================
// Formula
// =============================================================================

/// A generic drug formula (e.g. "Paracetamol 500mg").
///
/// Several branded products can share one formula; the register uses it to
/// suggest substitutes when a brand is out of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Formula {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// A register operator account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    /// PHC-format argon2 hash. Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// An immutable record of a committed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable number printed on the receipt: `YYYYMMDD-NNNN`.
    pub receipt_number: String,
    /// Operator who committed the order.
    pub user_id: String,
    /// Subtotal rounded to whole units.
    pub raw_total_cents: i64,
    pub discount_bps: u32,
    pub discount_cents: i64,
    /// `raw_total - discount`. Negative for refunds.
    pub total_cents: i64,
    pub is_refund: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }
}

/// A line of a committed order (snapshot of the cart line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    pub quantity: i64,
    /// Unit sale price at time of sale (frozen).
    pub unit_price_cents: i64,
    /// `unit_price × quantity`, unrounded.
    pub line_total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Store-wide settings editable by admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Settings {
    pub store_name: String,
    pub store_address: String,
    pub store_phone: String,
    /// Print the receipt automatically after a successful checkout.
    pub auto_print: bool,
    /// Products at or below this quantity raise a low-stock alert.
    pub low_stock_threshold: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_name: "Apotheca Pharmacy".to_string(),
            store_address: String::new(),
            store_phone: String::new(),
            auto_print: false,
            low_stock_threshold: crate::DEFAULT_LOW_STOCK_THRESHOLD,
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

// =============================================================================
// Analytics
// =============================================================================

/// Aggregate sales figures over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesSummary {
    pub order_count: i64,
    pub refund_count: i64,
    /// Sum of rounded raw totals.
    pub gross_cents: i64,
    pub discount_cents: i64,
    /// Sum of final totals (refunds subtract).
    pub net_cents: i64,
}

/// A best-selling product over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Net sales for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyTotal {
    /// `YYYY-MM-DD`
    pub day: String,
    pub order_count: i64,
    pub net_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
