//! # Order Repository
//!
//! Committed orders, their lines, and the SQLite [`OrderStore`].
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. receipt_counters[today] += 1        → 20240131-0007               │
//! │   2. INSERT orders                                                     │
//! │   3. for each line:                                                    │
//! │        INSERT order_items                                              │
//! │        UPDATE products SET quantity = quantity - line.quantity         │
//! │        (negative lines restock; unknown product aborts)               │
//! │  COMMIT  ── any failure above ──► ROLLBACK (no order, no stock change) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 1 writes first, so the transaction takes SQLite's write lock before
//! reading the counter and two registers can never draw the same number.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use apotheca_core::{Order, OrderItem, OrderRequest, OrderStore, PersistenceError};

const ORDER_COLUMNS: &str = "id, receipt_number, user_id, raw_total_cents, discount_bps, \
     discount_cents, total_cents, is_refund, created_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, name, quantity, unit_price_cents, line_total_cents";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists an order and applies its stock changes atomically.
    pub async fn commit(&self, request: OrderRequest) -> DbResult<Order> {
        debug!(
            user_id = %request.user_id,
            lines = request.lines.len(),
            total = %request.totals.final_total,
            "Committing order"
        );

        let mut tx = self.pool.begin().await?;

        match write_order(&mut tx, request, Utc::now()).await {
            Ok(order) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                info!(
                    order_id = %order.id,
                    receipt = %order.receipt_number,
                    "Order committed"
                );
                Ok(order)
            }
            Err(err) => {
                warn!(error = %err, "Order commit failed, rolling back");
                tx.rollback()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                Err(err)
            }
        }
    }

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(order).await
    }

    /// Gets an order by the number printed on its receipt.
    pub async fn get_by_receipt(&self, receipt_number: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE receipt_number = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(receipt_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(order).await
    }

    /// Most recent orders first. Lines are not loaded.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, receipt_number DESC \
             LIMIT ?1"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lines of an order in cart order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY position"
        );
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn with_items(&self, order: Option<Order>) -> DbResult<Option<Order>> {
        match order {
            Some(mut order) => {
                order.items = self.items(&order.id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }
}

impl OrderStore for OrderRepository {
    async fn commit_order(&self, request: OrderRequest) -> Result<Order, PersistenceError> {
        self.commit(request).await.map_err(PersistenceError::from)
    }
}

/// Writes the order inside `tx`. The caller commits or rolls back.
async fn write_order(
    tx: &mut Transaction<'_, Sqlite>,
    request: OrderRequest,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let day = now.format("%Y%m%d").to_string();
    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO receipt_counters (day, last_seq) VALUES (?1, 1)
        ON CONFLICT (day) DO UPDATE SET last_seq = last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(&day)
    .fetch_one(&mut **tx)
    .await?;

    let order = request.into_order(
        Uuid::new_v4().to_string(),
        receipt_number(&day, seq),
        now,
    );

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, receipt_number, user_id,
            raw_total_cents, discount_bps, discount_cents, total_cents,
            is_refund, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&order.id)
    .bind(&order.receipt_number)
    .bind(&order.user_id)
    .bind(order.raw_total_cents)
    .bind(order.discount_bps)
    .bind(order.discount_cents)
    .bind(order.total_cents)
    .bind(order.is_refund)
    .bind(order.created_at)
    .execute(&mut **tx)
    .await?;

    for (position, item) in order.items.iter().enumerate() {
        let updated = sqlx::query(
            "UPDATE products SET quantity = quantity - ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &item.product_id));
        }

        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, position, name,
                quantity, unit_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(position as i64)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .execute(&mut **tx)
        .await?;
    }

    Ok(order)
}

/// `YYYYMMDD-NNNN`, the sequence restarting every UTC day.
fn receipt_number(day: &str, seq: i64) -> String {
    format!("{day}-{seq:04}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use apotheca_core::{
        Category, CheckoutTotals, DiscountRate, Money, OrderLine, Product, ProductDraft,
    };

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stocked(db: &Database, name: &str, price_cents: i64, quantity: i64) -> Product {
        db.products()
            .insert(ProductDraft {
                name: name.to_string(),
                category: Category::Tablet,
                quantity,
                sale_price_cents: price_cents,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn request(lines: Vec<(&Product, i64)>, discount: DiscountRate) -> OrderRequest {
        let lines: Vec<OrderLine> = lines
            .into_iter()
            .map(|(product, quantity)| OrderLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity,
                unit_price_cents: product.sale_price_cents,
            })
            .collect();
        let subtotal: Money = lines.iter().map(OrderLine::line_total).sum();
        OrderRequest {
            user_id: "user-1".to_string(),
            lines,
            totals: CheckoutTotals::compute(subtotal, discount),
        }
    }

    #[tokio::test]
    async fn test_commit_persists_order_and_decrements_stock() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;

        let order = db
            .orders()
            .commit(request(vec![(&panadol, 3)], DiscountRate::from_percent(10)))
            .await
            .unwrap();

        assert_eq!(order.total_cents, 1300);
        assert_eq!(order.discount_cents, 200);
        assert_eq!(db.products().require(&panadol.id).await.unwrap().quantity, 7);

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.receipt_number, order.receipt_number);
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].quantity, 3);
        assert_eq!(stored.items[0].line_total_cents, 1500);
        assert_eq!(stored.discount_rate(), DiscountRate::from_percent(10));
    }

    #[tokio::test]
    async fn test_receipt_numbers_count_up_within_a_day() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;

        let first = db
            .orders()
            .commit(request(vec![(&panadol, 1)], DiscountRate::zero()))
            .await
            .unwrap();
        let second = db
            .orders()
            .commit(request(vec![(&panadol, 1)], DiscountRate::zero()))
            .await
            .unwrap();

        let day = first.created_at.format("%Y%m%d").to_string();
        assert_eq!(first.receipt_number, format!("{day}-0001"));
        assert_eq!(second.receipt_number, format!("{day}-0002"));

        let found = db
            .orders()
            .get_by_receipt(&second.receipt_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn test_refund_restocks() {
        let db = test_db().await;
        let inhaler = stocked(&db, "Ventolin", 10_000, 1).await;

        let order = db
            .orders()
            .commit(request(vec![(&inhaler, -2)], DiscountRate::zero()))
            .await
            .unwrap();

        assert!(order.is_refund);
        assert_eq!(order.total_cents, -20_000);
        assert_eq!(db.products().require(&inhaler.id).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_everything() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;
        let mut ghost = panadol.clone();
        ghost.id = "no-such-product".to_string();

        let err = db
            .orders()
            .commit(request(vec![(&panadol, 2), (&ghost, 1)], DiscountRate::zero()))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.products().require(&panadol.id).await.unwrap().quantity, 10);
        assert!(db.orders().list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_store_wraps_errors() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;
        let mut ghost = panadol.clone();
        ghost.id = "no-such-product".to_string();

        let err = db
            .orders()
            .commit_order(request(vec![(&ghost, 1)], DiscountRate::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Product not found: no-such-product");
    }

    #[tokio::test]
    async fn test_sold_product_cannot_be_deleted() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;
        db.orders()
            .commit(request(vec![(&panadol, 1)], DiscountRate::zero()))
            .await
            .unwrap();

        let err = db.products().delete(&panadol.id).await.unwrap_err();
        assert!(matches!(err, DbError::Referenced { .. }));
        assert!(db.products().get_by_id(&panadol.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let db = test_db().await;
        let panadol = stocked(&db, "Panadol", 500, 10).await;
        let orders = db.orders();
        let first = orders
            .commit(request(vec![(&panadol, 1)], DiscountRate::zero()))
            .await
            .unwrap();
        let second = orders
            .commit(request(vec![(&panadol, 1)], DiscountRate::zero()))
            .await
            .unwrap();

        let recent = orders.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);
        assert!(recent[0].items.is_empty());
    }

    #[test]
    fn test_receipt_number_format() {
        assert_eq!(receipt_number("20240131", 7), "20240131-0007");
        assert_eq!(receipt_number("20240131", 12345), "20240131-12345");
    }
}
