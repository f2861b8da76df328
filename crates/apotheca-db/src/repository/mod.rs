//! # Repository Module
//!
//! Database repository implementations for Apotheca POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register command                                                      │
//! │       │                                                                 │
//! │       │  db.products().search("panadol", 20)                           │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── search(&self, query, limit)                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, draft)                                              │
//! │  └── adjust_stock(&self, id, delta)                                    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Stock ledger: catalog CRUD, search, stock
//! - [`OrderRepository`](order::OrderRepository) - Order commit (the `OrderStore`) and history
//! - [`UserRepository`](user::UserRepository) - Operator accounts, plus the `Authenticator`
//! - [`FormulaRepository`](formula::FormulaRepository) - Generic formulas for substitutes
//! - [`SettingsRepository`](settings::SettingsRepository) - Store settings row
//! - [`ReportRepository`](report::ReportRepository) - Sales analytics

pub mod formula;
pub mod order;
pub mod product;
pub mod report;
pub mod settings;
pub mod user;
