//! # apotheca-core: Pure Business Logic for Apotheca POS
//!
//! This crate is the **heart** of Apotheca POS. It contains the cart,
//! multi-cart session and checkout rules as pure code with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Apotheca POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Register (apps/register)                        │   │
//! │  │    scan ──► cart ops ──► discount ──► checkout ──► receipt      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ apotheca-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌──────────┐  ┌─────────────────┐  │   │
//! │  │   │  types  │  │  money  │  │   cart   │  │    checkout     │  │   │
//! │  │   │ Product │  │  Money  │  │   Cart   │  │ CheckoutEngine  │  │   │
//! │  │   │  Order  │  │ rounding│  │ session  │  │   OrderStore ◄──┼──┼── apotheca-db
//! │  │   └─────────┘  └─────────┘  └──────────┘  └─────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Formula, User, Settings)
//! - [`money`] - Money type with integer arithmetic and whole-unit rounding
//! - [`cart`] - A single customer's cart
//! - [`session`] - Several carts held by one register
//! - [`checkout`] - Checkout state machine and the `OrderStore` seam
//! - [`auth`] - Roles and the explicit logged-in session
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use apotheca_core::money::Money;
//! use apotheca_core::types::DiscountRate;
//!
//! // 3 × 5.00 with a 10% discount
//! let raw = Money::from_cents(1500).round_to_unit();
//! let discount = raw.discount_amount(DiscountRate::from_percent(10));
//!
//! // 1.50 rounds up to 2.00
//! assert_eq!(discount.cents(), 200);
//! assert_eq!((raw - discount).cents(), 1300);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{Role, UserSession};
pub use cart::{Cart, CartLineItem};
pub use checkout::{
    CheckoutEngine, CheckoutOutcome, CheckoutState, CheckoutTotals, OrderLine, OrderRequest,
    OrderStore, PendingCheckout,
};
pub use error::{CoreError, CoreResult, PersistenceError, ValidationError};
pub use money::Money;
pub use session::MultiCartSession;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of carts a single register may hold open.
///
/// ## Business Reason
/// A counter rarely serves more than a handful of customers in parallel;
/// the cap stops a stuck key from spawning carts forever.
pub const MAX_OPEN_CARTS: usize = 20;

/// Default low-stock threshold used until an admin changes the settings.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
