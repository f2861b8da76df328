//! # Report Repository
//!
//! Read-only sales analytics over committed orders.
//!
//! Date ranges are inclusive calendar days in UTC, matched against the date
//! part of `orders.created_at`.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use apotheca_core::{DailyTotal, SalesSummary, TopProduct};

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Order count, refunds and money totals for `from..=to`.
    pub async fn sales_summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<SalesSummary> {
        debug!(%from, %to, "Building sales summary");

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COUNT(*)                           AS order_count,
                COALESCE(SUM(is_refund), 0)        AS refund_count,
                COALESCE(SUM(raw_total_cents), 0)  AS gross_cents,
                COALESCE(SUM(discount_cents), 0)   AS discount_cents,
                COALESCE(SUM(total_cents), 0)      AS net_cents
            FROM orders
            WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from.format(DAY_FORMAT).to_string())
        .bind(to.format(DAY_FORMAT).to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Best sellers by net quantity. Refunded units count against the product.
    pub async fn top_products(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        debug!(%from, %to, limit, "Building top products");

        let products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                oi.product_id              AS product_id,
                MAX(oi.name)               AS name,
                SUM(oi.quantity)           AS quantity,
                SUM(oi.line_total_cents)   AS revenue_cents
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE substr(o.created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY oi.product_id
            HAVING SUM(oi.quantity) > 0
            ORDER BY quantity DESC, revenue_cents DESC, name
            LIMIT ?3
            "#,
        )
        .bind(from.format(DAY_FORMAT).to_string())
        .bind(to.format(DAY_FORMAT).to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// One row per day that has orders, oldest first.
    pub async fn daily_totals(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DailyTotal>> {
        let days = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT
                substr(created_at, 1, 10)  AS day,
                COUNT(*)                   AS order_count,
                SUM(total_cents)           AS net_cents
            FROM orders
            WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from.format(DAY_FORMAT).to_string())
        .bind(to.format(DAY_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
