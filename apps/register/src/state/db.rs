//! # Database State
//!
//! Wraps the `Database` connection for use in register commands.
//!
//! ## Thread Safety
//! The `Database` struct from `apotheca-db` contains a `SqlitePool` which
//! is inherently thread-safe. The shell and the low-stock monitor query it
//! concurrently without explicit locking.

use std::path::PathBuf;

use apotheca_db::{migrations, Database, DbConfig, DbResult};
use directories::ProjectDirs;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::ConfigState;

/// Wrapper around `Database` for register state management.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Opens (and migrates) the database the config points at.
    pub async fn open(config: &ConfigState) -> ApiResult<Self> {
        let path = database_path(config)?;
        info!(path = %path.display(), "Database path determined");

        let db = Database::new(DbConfig::new(path)).await?;
        let (total, applied) = migrations::migration_status(db.pool()).await?;
        info!(total, applied, "Database ready");

        Ok(DbState::new(db))
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> DbResult<Self> {
        Ok(DbState::new(Database::new(DbConfig::in_memory()).await?))
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let products = db_state.inner().products().search("query", 20).await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.apotheca.pos/apotheca.db`
/// - **Windows**: `%APPDATA%\apotheca\pos\data\apotheca.db`
/// - **Linux**: `~/.local/share/pos/apotheca.db`
///
/// `APOTHECA_DB_PATH` (or `--db`) overrides the platform path.
pub fn database_path(config: &ConfigState) -> ApiResult<PathBuf> {
    if let Some(path) = &config.db_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "apotheca", "pos")
        .ok_or_else(|| ApiError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();

    // Create directory if it doesn't exist
    std::fs::create_dir_all(data_dir).map_err(|e| {
        ApiError::internal(format!(
            "Could not create data directory {}: {}",
            data_dir.display(),
            e
        ))
    })?;

    Ok(data_dir.join("apotheca.db"))
}
