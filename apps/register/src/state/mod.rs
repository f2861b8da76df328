//! # State Module
//!
//! Register state, one type per concern. Commands take only the state they
//! need.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   DbState    │  │ SessionState │  │   ConfigState    │              │
//! │  │              │  │              │  │                  │              │
//! │  │  Database    │  │  Mutex<      │  │  db_path         │              │
//! │  │  (SQLite     │  │   Register-  │  │  currency        │              │
//! │  │   pool)      │  │   Session>   │  │  poll interval   │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  ┌──────────────────────────────┐                                      │
//! │  │ LowStockHandle (watch::Rx)   │ ◄── LowStockMonitor task             │
//! │  └──────────────────────────────┘                                      │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • SessionState: tokio Mutex, held across the checkout commit          │
//! │  • ConfigState: Read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod alerts;
mod config;
mod db;
mod session;

pub use alerts::{LowStockAlert, LowStockHandle, LowStockMonitor};
pub use config::ConfigState;
pub use db::{database_path, DbState};
pub use session::{RegisterSession, SessionState};
