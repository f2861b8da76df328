//! # Settings Repository
//!
//! The single `settings` row (id = 1), seeded by the initial migration.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use apotheca_core::validation::{validate_product_name, validate_stock_quantity};
use apotheca_core::Settings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads the settings row.
    pub async fn get(&self) -> DbResult<Settings> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            SELECT store_name, store_address, store_phone, auto_print,
                   low_stock_threshold, updated_at
            FROM settings WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        settings.ok_or_else(|| DbError::not_found("Settings", "1"))
    }

    /// Replaces the settings row. `updated_at` is set to now.
    pub async fn update(&self, settings: Settings) -> DbResult<Settings> {
        let store_name = settings.store_name.trim().to_string();
        validate_product_name(&store_name)?;
        validate_stock_quantity(settings.low_stock_threshold)?;

        let updated = Settings {
            store_name,
            store_address: settings.store_address.trim().to_string(),
            store_phone: settings.store_phone.trim().to_string(),
            updated_at: Utc::now(),
            ..settings
        };

        sqlx::query(
            r#"
            INSERT INTO settings (
                id, store_name, store_address, store_phone,
                auto_print, low_stock_threshold, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (id) DO UPDATE SET
                store_name = excluded.store_name,
                store_address = excluded.store_address,
                store_phone = excluded.store_phone,
                auto_print = excluded.auto_print,
                low_stock_threshold = excluded.low_stock_threshold,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&updated.store_name)
        .bind(&updated.store_address)
        .bind(&updated.store_phone)
        .bind(updated.auto_print)
        .bind(updated.low_stock_threshold)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            store_name = %updated.store_name,
            auto_print = updated.auto_print,
            low_stock_threshold = updated.low_stock_threshold,
            "Settings updated"
        );
        Ok(updated)
    }
}
