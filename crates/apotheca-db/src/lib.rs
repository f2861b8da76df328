//! # apotheca-db: Database Layer for Apotheca POS
//!
//! SQLite storage for the pharmacy register: the stock ledger, committed
//! orders, operator accounts, formulas, settings and reports.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Apotheca POS Data Flow                            │
//! │                                                                         │
//! │  Register command (checkout)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutEngine (apotheca-core) ──► OrderStore::commit_order            │
//! │                                          │                              │
//! │  ┌───────────────────────────────────────▼─────────────────────────┐   │
//! │  │                   apotheca-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ Product, Order │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ User, Formula  │    │ 001_init.sql │  │   │
//! │  │   │               │    │ Settings, ...  │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apotheca.db (platform data dir)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apotheca_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/apotheca.db")).await?;
//!
//! let hits = db.products().search("panadol", 20).await?;
//! let order = engine.checkout(&mut session, &db.orders(), &user).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::formula::FormulaRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::settings::SettingsRepository;
pub use repository::user::{Authenticator, UserRepository};
