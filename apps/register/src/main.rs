//! # Apotheca Register Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Apotheca Register                                │
//! │                                                                         │
//! │  main.rs ────► parses argv (clap)                                      │
//! │  lib.rs ─────► logging, config, database, subcommand                   │
//! │  shell.rs ───► login, scan, cart, checkout, receipt                    │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         SQLite Database                          │  │
//! │  │  apotheca.db (local file, WAL mode)                              │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apotheca_register::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    apotheca_register::run(Cli::parse()).await
}
