//! # Apotheca Register
//!
//! The register application: state, commands and the command-line shell on
//! top of `apotheca-core` and `apotheca-db`.
//!
//! ## Module Organization
//! ```text
//! apotheca_register/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── cli.rs          ◄─── clap definitions for argv and shell lines
//! ├── shell.rs        ◄─── Interactive register loop
//! ├── state/
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── session.rs  ◄─── Carts, checkout engine, logged-in operator
//! │   ├── config.rs   ◄─── Configuration state
//! │   └── alerts.rs   ◄─── Low-stock monitor task
//! ├── commands/       ◄─── One module per concern (cart, checkout, ...)
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Multiple State Types)
//! Instead of a single `AppState` struct, each concern has its own state
//! type and every command asks only for what it touches:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐    │
//! │  │    DbState       │ │  SessionState    │ │    ConfigState       │    │
//! │  │                  │ │                  │ │                      │    │
//! │  │  • Database pool │ │  • Open carts    │ │  • Database path     │    │
//! │  │  • Repositories  │ │  • Discount      │ │  • Currency          │    │
//! │  │                  │ │  • Operator      │ │  • Receipt width     │    │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod shell;
pub mod state;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use apotheca_core::Role;
use cli::{Cli, Command};
use shell::Shell;
use state::{ConfigState, DbState, LowStockMonitor};

/// Credentials of the account created on first start.
const BOOTSTRAP_ADMIN: (&str, &str) = ("admin", "admin123");

/// Runs the register.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging (stderr, RUST_LOG overrides the default)        │
/// │  2. Load ConfigState from APOTHECA_* variables, --db on top            │
/// │  3. Open the database, run pending migrations                          │
/// │  4. Run the subcommand:                                                │
/// │     shell (default)                                                    │
/// │       • create the bootstrap admin if there are no users               │
/// │       • start the low-stock monitor                                    │
/// │       • read commands from stdin until quit                            │
/// │     low-stock / report / create-admin                                  │
/// │       • print JSON and exit                                            │
/// │  5. Close the pool                                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = ConfigState::from_env();
    if let Some(path) = cli.db {
        config.db_path = Some(path);
    }

    info!("Starting Apotheca register");
    let db = DbState::open(&config).await?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let (username, password) = BOOTSTRAP_ADMIN;
            if let Some(admin) = db
                .inner()
                .users()
                .ensure_bootstrap_admin(username, password)
                .await?
            {
                warn!(
                    username = %admin.username,
                    "Created default admin account, change its password with `passwd`"
                );
            }

            let monitor =
                LowStockMonitor::new(db.inner().clone(), config.low_stock_poll_interval());
            let alerts = monitor.start();

            Shell::new(db.clone(), config, Some(alerts)).run().await?;
        }
        Command::LowStock { threshold } => {
            let products = commands::product::low_stock(&db, threshold).await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Command::Report { from, to, top } => {
            let from = from.unwrap_or_else(|| Utc::now().date_naive());
            let to = to.unwrap_or(from);
            let report = commands::report::build_report(&db, from, to, Some(top)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::CreateAdmin {
            username,
            password,
            full_name,
        } => {
            let user = db
                .inner()
                .users()
                .create(&username, &full_name, &password, Role::Admin)
                .await?;
            println!("Created admin {} ({})", user.username, user.id);
        }
    }

    db.inner().close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so they do not interleave with shell output.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=apotheca=trace` - Show trace for apotheca crates only
/// - Default: INFO, DEBUG for apotheca crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,apotheca=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
