//! # Formula Repository
//!
//! Generic drug formulas. Products sharing a formula are offered as
//! substitutes; deleting a formula detaches its products (`ON DELETE SET NULL`).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use apotheca_core::validation::validate_product_name;
use apotheca_core::Formula;

/// Repository for formula database operations.
#[derive(Debug, Clone)]
pub struct FormulaRepository {
    pool: SqlitePool,
}

impl FormulaRepository {
    /// Creates a new FormulaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FormulaRepository { pool }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> DbResult<Formula> {
        let name = name.trim();
        validate_product_name(name)?;

        let formula = Formula {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: normalize(description),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO formulas (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&formula.id)
        .bind(&formula.name)
        .bind(&formula.description)
        .bind(formula.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_name(e, name))?;

        info!(formula_id = %formula.id, name = %formula.name, "Formula created");
        Ok(formula)
    }

    pub async fn list(&self) -> DbResult<Vec<Formula>> {
        let formulas = sqlx::query_as::<_, Formula>(
            "SELECT id, name, description, created_at FROM formulas ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(formulas)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Formula>> {
        let formula = sqlx::query_as::<_, Formula>(
            "SELECT id, name, description, created_at FROM formulas WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(formula)
    }

    pub async fn rename(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> DbResult<Formula> {
        let name = name.trim();
        validate_product_name(name)?;
        debug!(formula_id = %id, name = %name, "Updating formula");

        let result = sqlx::query("UPDATE formulas SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .bind(normalize(description))
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_name(e, name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Formula", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Formula", id))
    }

    /// Deletes a formula. Products that used it keep existing without one.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM formulas WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Formula", id));
        }

        info!(formula_id = %id, "Formula deleted");
        Ok(())
    }
}

fn normalize(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn duplicate_name(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("formula", name),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
