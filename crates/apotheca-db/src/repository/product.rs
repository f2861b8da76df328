//! # Product Repository
//!
//! The stock ledger: product records and their quantity on hand.
//!
//! ## Key Operations
//! - Lookup by barcode (exact) or name fragment
//! - CRUD operations
//! - Stock adjustments (delta updates)
//! - Low-stock and substitute queries
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types / scans: "8964000012345"                                │
//! │       │                                                                 │
//! │       ├── all digits, ≥ 6 chars ──► barcode = ?  (exact)               │
//! │       │                               │                                 │
//! │       │                               └── no hit? fall through          │
//! │       ▼                                                                 │
//! │  name LIKE '%fragment%' (case-insensitive) ORDER BY name               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use apotheca_core::validation::{looks_like_barcode, validate_search_query};
use apotheca_core::{Category, Product, ProductDraft};

const PRODUCT_COLUMNS: &str = "id, name, barcode, category, quantity, purchase_price_cents, \
     sale_price_cents, description, formula_id, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by barcode or name.
    ///
    /// ## Arguments
    /// * `query` - Scanned barcode or part of a name; empty lists everything
    /// * `limit` - Maximum results to return
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit).await;
        }

        if looks_like_barcode(&query) {
            let hits = self.find_by_barcode(&query).await?;
            if !hits.is_empty() {
                return Ok(hits);
            }
        }

        let pattern = format!("%{}%", escape_like(&query));
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name LIKE ?1 ESCAPE '\\' \
             ORDER BY name COLLATE NOCASE \
             LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists products sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn list_by_category(&self, category: Category) -> DbResult<Vec<Product>> {
        debug!(category = %category, "Listing products by category");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ?1 \
             ORDER BY name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing product is an error.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Exact barcode lookup. Barcodes are not unique, so several products
    /// may come back.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 \
             ORDER BY name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product from a draft.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated ID and timestamps
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown formula
    pub async fn insert(&self, draft: ProductDraft) -> DbResult<Product> {
        draft.validate()?;

        let product = Product::from_draft(generate_product_id(), draft, Utc::now());
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, category, quantity,
                purchase_price_cents, sale_price_cents,
                description, formula_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.category)
        .bind(product.quantity)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(&product.description)
        .bind(&product.formula_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Replaces a product's editable fields.
    ///
    /// The draft's `quantity` overwrites the stock figure; use
    /// [`adjust_stock`](Self::adjust_stock) for deliveries and corrections.
    pub async fn update(&self, id: &str, draft: ProductDraft) -> DbResult<Product> {
        draft.validate()?;

        debug!(id = %id, "Updating product");

        let existing = self.require(id).await?;
        let mut product = Product::from_draft(existing.id, draft, Utc::now());
        product.created_at = existing.created_at;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                barcode = ?3,
                category = ?4,
                quantity = ?5,
                purchase_price_cents = ?6,
                sale_price_cents = ?7,
                description = ?8,
                formula_id = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.category)
        .bind(product.quantity)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(&product.description)
        .bind(&product.formula_id)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Adds `delta` to a product's quantity on hand and returns the product.
    ///
    /// ## Delta Updates
    /// ```text
    /// ❌ UPDATE products SET quantity = 7           (loses a parallel sale)
    /// ✅ UPDATE products SET quantity = quantity + ?
    /// ```
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            "UPDATE products SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.require(id).await
    }

    /// Deletes a product.
    ///
    /// ## Returns
    /// * `Err(DbError::Referenced)` - Past orders still point at it
    /// * `Err(DbError::NotFound)` - No such product
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)
            .map_err(|err| match err {
                DbError::ForeignKeyViolation { .. } => DbError::Referenced {
                    entity: "Product".to_string(),
                    id: id.to_string(),
                    referenced_by: "past orders".to_string(),
                },
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Products at or below `threshold`, emptiest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE quantity <= ?1 \
             ORDER BY quantity, name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Other products sharing this product's formula, in-stock first.
    ///
    /// A product without a formula has no substitutes.
    pub async fn substitutes(&self, product_id: &str) -> DbResult<Vec<Product>> {
        let product = self.require(product_id).await?;
        let Some(formula_id) = product.formula_id else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE formula_id = ?1 AND id <> ?2 \
             ORDER BY quantity > 0 DESC, sale_price_cents, name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(formula_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn draft(name: &str, barcode: Option<&str>, quantity: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            category: Category::Tablet,
            quantity,
            purchase_price_cents: 300,
            sale_price_cents: 500,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo
            .insert(draft("Panadol 500mg", Some("8964000012345"), 10))
            .await
            .unwrap();
        let fetched = repo.get_by_id(&product.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Panadol 500mg");
        assert_eq!(fetched.quantity, 10);
        assert_eq!(fetched.category, Category::Tablet);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_draft() {
        let db = test_db().await;
        let err = db.products().insert(draft("", None, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_by_barcode_and_name() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(draft("Panadol 500mg", Some("8964000012345"), 10))
            .await
            .unwrap();
        repo.insert(draft("Panadol Extra", Some("8964000099999"), 4))
            .await
            .unwrap();
        repo.insert(draft("Brufen 400mg", None, 8)).await.unwrap();

        let by_barcode = repo.search("8964000012345", 20).await.unwrap();
        assert_eq!(by_barcode.len(), 1);
        assert_eq!(by_barcode[0].name, "Panadol 500mg");

        let by_name = repo.search("panadol", 20).await.unwrap();
        assert_eq!(by_name.len(), 2);

        let everything = repo.search("   ", 20).await.unwrap();
        assert_eq!(everything.len(), 3);

        // LIKE wildcards are literal
        assert!(repo.search("%", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_stock_can_go_negative() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(draft("Brufen", None, 2)).await.unwrap();

        let after = repo.adjust_stock(&product.id, -3).await.unwrap();
        assert_eq!(after.quantity, -1);

        let after = repo.adjust_stock(&product.id, 11).await.unwrap();
        assert_eq!(after.quantity, 10);

        assert!(matches!(
            repo.adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(draft("Brufen", None, 2)).await.unwrap();

        let mut edit = draft("Brufen 400mg", None, 7);
        edit.sale_price_cents = 650;
        let updated = repo.update(&product.id, edit).await.unwrap();

        assert_eq!(updated.created_at, product.created_at);
        let fetched = repo.require(&product.id).await.unwrap();
        assert_eq!(fetched.name, "Brufen 400mg");
        assert_eq!(fetched.sale_price_cents, 650);
        assert_eq!(fetched.quantity, 7);
    }

    #[tokio::test]
    async fn test_low_stock_and_category() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(draft("A", None, 0)).await.unwrap();
        repo.insert(draft("B", None, 5)).await.unwrap();
        let mut syrup = draft("C", None, 50);
        syrup.category = Category::Syrup;
        repo.insert(syrup).await.unwrap();

        let low = repo.low_stock(5).await.unwrap();
        let names: Vec<_> = low.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);

        let syrups = repo.list_by_category(Category::Syrup).await.unwrap();
        assert_eq!(syrups.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.insert(draft("Brufen", None, 2)).await.unwrap();

        repo.delete(&product.id).await.unwrap();
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&product.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("panadol"), "panadol");
    }
}
