//! # Commands Module
//!
//! Every operation the register exposes. The shell (and any future front
//! end) calls these; they hold no state of their own.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── auth.rs      ◄─── Login, logout, whoami
//! ├── cart.rs      ◄─── Scan, quantities, parking carts, discount
//! ├── checkout.rs  ◄─── Checkout, receipts, order history
//! ├── formula.rs   ◄─── Generic formulas (substitutes)
//! ├── product.rs   ◄─── Product search, catalog maintenance
//! ├── report.rs    ◄─── Sales analytics
//! ├── settings.rs  ◄─── Register config and store settings
//! └── user.rs      ◄─── Account management
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Shell line: "add 3f2a..."                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  cli::dispatch()                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn add_to_cart(                                                  │
//! │      db: &DbState,            ◄── only the state it needs              │
//! │      session: &SessionState,                                            │
//! │      product_id: &str,                                                  │
//! │  ) -> Result<SessionView, ApiError>                                     │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  Shell prints the view or "ERROR CODE: message"                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs database
//! async fn search_products(db: &DbState, ...)
//!
//! // Only needs the register session
//! async fn set_discount(session: &SessionState, ...)
//!
//! // Needs both
//! async fn add_to_cart(db: &DbState, session: &SessionState, ...)
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod formula;
pub mod product;
pub mod report;
pub mod settings;
pub mod user;
