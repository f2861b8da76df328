//! # Product Commands
//!
//! Catalog search for the counter and catalog maintenance for admins.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types or scans "8964000012345"                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  search_products(query)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Looks like a barcode? (≥ 6 digits)       │                         │
//! │  │  YES: exact barcode lookup first          │──► Found? Return hits   │
//! │  │  NO:  name fragment, case-insensitive     │                         │
//! │  └───────────────────────────────────────────┘                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<ProductDto> with current quantity on hand                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use apotheca_core::{Category, Product, ProductDraft, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

/// Default and maximum search result counts.
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

/// Product DTO for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub category: Category,
    /// Quantity on hand. May be negative after concurrent sales.
    pub quantity: i64,
    pub sale_price_cents: i64,
    pub purchase_price_cents: i64,
    pub description: Option<String>,
    pub formula_id: Option<String>,
    pub in_stock: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let in_stock = p.is_in_stock();
        ProductDto {
            id: p.id,
            name: p.name,
            barcode: p.barcode,
            category: p.category,
            quantity: p.quantity,
            sale_price_cents: p.sale_price_cents,
            purchase_price_cents: p.purchase_price_cents,
            description: p.description,
            formula_id: p.formula_id,
            in_stock,
        }
    }
}

fn to_dtos(products: Vec<Product>) -> Vec<ProductDto> {
    products.into_iter().map(ProductDto::from).collect()
}

/// Searches products by barcode or name fragment.
///
/// ## Arguments
/// * `query` - Scanned barcode or part of a name; empty lists the catalog
/// * `limit` - Maximum results to return (default: 20, max: 100)
pub async fn search_products(
    db: &DbState,
    query: &str,
    limit: Option<u32>,
) -> ApiResult<Vec<ProductDto>> {
    let start = Instant::now();
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    debug!(query = %query, limit = %limit, "search_products command");

    let products = db.inner().products().search(query, limit).await?;
    let dtos = to_dtos(products);

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        "search_products complete"
    );

    Ok(dtos)
}

/// Gets a single product by its UUID.
pub async fn get_product(db: &DbState, id: &str) -> ApiResult<ProductDto> {
    debug!(id = %id, "get_product command");
    let product = db
        .inner()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(ProductDto::from(product))
}

pub async fn list_by_category(db: &DbState, category: Category) -> ApiResult<Vec<ProductDto>> {
    debug!(category = %category, "list_by_category command");
    Ok(to_dtos(db.inner().products().list_by_category(category).await?))
}

/// Other products sharing the same formula, in-stock and cheapest first.
pub async fn substitutes(db: &DbState, product_id: &str) -> ApiResult<Vec<ProductDto>> {
    debug!(product_id = %product_id, "substitutes command");
    Ok(to_dtos(db.inner().products().substitutes(product_id).await?))
}

/// Products at or below `threshold`, or the settings threshold when `None`.
pub async fn low_stock(db: &DbState, threshold: Option<i64>) -> ApiResult<Vec<ProductDto>> {
    let threshold = match threshold {
        Some(threshold) => threshold,
        None => db.inner().settings().get().await?.low_stock_threshold,
    };
    debug!(threshold, "low_stock command");
    Ok(to_dtos(db.inner().products().low_stock(threshold).await?))
}

// =============================================================================
// Catalog Maintenance (admin)
// =============================================================================

pub async fn create_product(
    db: &DbState,
    session: &SessionState,
    draft: ProductDraft,
) -> ApiResult<ProductDto> {
    session.lock().await.require_role(Role::Admin, "Adding products")?;
    debug!(name = %draft.name, "create_product command");

    let product = db.inner().products().insert(draft).await?;
    Ok(ProductDto::from(product))
}

pub async fn update_product(
    db: &DbState,
    session: &SessionState,
    id: &str,
    draft: ProductDraft,
) -> ApiResult<ProductDto> {
    session.lock().await.require_role(Role::Admin, "Editing products")?;
    debug!(id = %id, "update_product command");

    let product = db.inner().products().update(id, draft).await?;
    Ok(ProductDto::from(product))
}

/// Deletes a product. Refused while past orders reference it.
pub async fn delete_product(db: &DbState, session: &SessionState, id: &str) -> ApiResult<()> {
    session.lock().await.require_role(Role::Admin, "Deleting products")?;
    debug!(id = %id, "delete_product command");

    db.inner().products().delete(id).await?;
    Ok(())
}

/// Receives (positive) or writes off (negative) stock.
pub async fn adjust_stock(
    db: &DbState,
    session: &SessionState,
    id: &str,
    delta: i64,
) -> ApiResult<ProductDto> {
    session.lock().await.require_role(Role::Admin, "Adjusting stock")?;
    debug!(id = %id, delta, "adjust_stock command");

    let product = db.inner().products().adjust_stock(id, delta).await?;
    Ok(ProductDto::from(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use apotheca_core::UserSession;
    use chrono::Utc;

    fn draft(name: &str, barcode: Option<&str>, quantity: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            category: Category::Tablet,
            quantity,
            purchase_price_cents: 350,
            sale_price_cents: 500,
            ..Default::default()
        }
    }

    async fn signed_in(role: Role) -> SessionState {
        let state = SessionState::new();
        state.lock().await.sign_in(UserSession {
            user_id: "u-1".to_string(),
            username: "ayesha".to_string(),
            full_name: "Ayesha".to_string(),
            role,
            started_at: Utc::now(),
        });
        state
    }

    #[tokio::test]
    async fn test_admin_creates_and_searches() {
        let db = DbState::in_memory().await.unwrap();
        let admin = signed_in(Role::Admin).await;

        create_product(&db, &admin, draft("Panadol 500mg", Some("8964000012345"), 10))
            .await
            .unwrap();
        create_product(&db, &admin, draft("Brufen 400mg", None, 0))
            .await
            .unwrap();

        let hits = search_products(&db, "8964000012345", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Panadol 500mg");
        assert!(hits[0].in_stock);

        let hits = search_products(&db, "bru", Some(0)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].in_stock);
    }

    #[tokio::test]
    async fn test_cashier_cannot_edit_catalog() {
        let db = DbState::in_memory().await.unwrap();
        let cashier = signed_in(Role::Cashier).await;

        let err = create_product(&db, &cashier, draft("Panadol", None, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let nobody = SessionState::new();
        let err = create_product(&db, &nobody, draft("Panadol", None, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_adjust_stock_and_low_stock() {
        let db = DbState::in_memory().await.unwrap();
        let admin = signed_in(Role::Admin).await;
        let product = create_product(&db, &admin, draft("Panadol", None, 20))
            .await
            .unwrap();

        assert!(low_stock(&db, None).await.unwrap().is_empty());

        let product = adjust_stock(&db, &admin, &product.id, -15).await.unwrap();
        assert_eq!(product.quantity, 5);

        let low = low_stock(&db, None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert!(low_stock(&db, Some(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_product() {
        let db = DbState::in_memory().await.unwrap();
        let err = get_product(&db, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
