//! # Cart
//!
//! A single customer's cart.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Operations                                  │
//! │                                                                         │
//! │  Operator Action         Cart Method               Line Change          │
//! │  ───────────────         ───────────               ───────────          │
//! │                                                                         │
//! │  Scan / pick ───────────► add_or_increment() ────► push or qty + 1     │
//! │                                                                         │
//! │  Type quantity ─────────► set_quantity() ────────► qty = n (n may be   │
//! │                                                    zero or negative)   │
//! │                                                                         │
//! │  Click remove ──────────► remove_item() ─────────► line dropped        │
//! │                                                                         │
//! │  Click clear ───────────► clear() ───────────────► all lines dropped   │
//! │                                                                         │
//! │  NOTE: a failing call leaves the cart exactly as it was.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Snapshot
//! The quantity on hand is copied into the line the first time a product is
//! added and is the only ceiling the cart ever checks. It is not re-read from
//! the ledger, so two registers can both sell the last unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::MAX_STOCK_QUANTITY;
use crate::types::{Category, Product};

// =============================================================================
// Cart Line Item
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// - Product fields are a frozen copy taken at add time, so a catalog edit
///   while the customer waits does not change the price on the counter.
/// - `quantity` may be zero or negative: a negative line is a refund in
///   progress.
/// - `stock` is the quantity on hand when the line was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineItem {
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    pub barcode: Option<String>,

    pub category: Category,

    /// Sale price in minor units at time of adding (frozen)
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// Quantity on hand when the line was created
    pub stock: i64,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Creates a line with quantity 1 from a product snapshot.
    pub fn from_product(product: &Product, available_stock: i64) -> Self {
        CartLineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            barcode: product.barcode.clone(),
            category: product.category,
            unit_price_cents: product.sale_price_cents,
            quantity: 1,
            stock: available_stock,
            added_at: Utc::now(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price × quantity`, unrounded.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// True when the quantity is above the stock snapshot.
    #[inline]
    pub fn exceeds_stock(&self) -> bool {
        self.quantity > self.stock
    }

    fn insufficient(&self, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            name: self.name.clone(),
            available: self.stock,
            requested,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// An ordered collection of line items.
///
/// ## Invariants
/// - At most one line per product id
/// - Lines keep insertion order (display only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    items: Vec<CartLineItem>,

    /// When the cart was created or last cleared
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of a product, or bumps an existing line by one.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity + 1, unless that exceeds the
    ///   line's stock snapshot
    /// - Product not in cart: appended with quantity 1 when
    ///   `available_stock > 0`
    ///
    /// ```rust
    /// use apotheca_core::cart::Cart;
    /// # use apotheca_core::types::Product;
    /// # let product: Product = serde_json::from_value(serde_json::json!({
    /// #     "id": "p-1", "name": "Panadol", "barcode": null, "category": "tablet",
    /// #     "quantity": 1, "purchase_price_cents": 350, "sale_price_cents": 500,
    /// #     "description": null, "formula_id": null,
    /// #     "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
    /// # })).unwrap();
    ///
    /// let mut cart = Cart::new();
    /// cart.add_or_increment(&product, 1).unwrap();
    /// assert!(cart.add_or_increment(&product, 1).is_err()); // only 1 on hand
    /// assert_eq!(cart.total_quantity(), 1);
    /// ```
    pub fn add_or_increment(&mut self, product: &Product, available_stock: i64) -> CoreResult<()> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let requested = item.quantity + 1;
            if requested > item.stock {
                return Err(item.insufficient(requested));
            }
            item.quantity = requested;
            debug!(product_id = %product.id, quantity = requested, "Incremented cart line");
            return Ok(());
        }

        if available_stock <= 0 {
            return Err(CoreError::OutOfStock {
                name: product.name.clone(),
            });
        }

        self.items
            .push(CartLineItem::from_product(product, available_stock));
        debug!(product_id = %product.id, stock = available_stock, "Added cart line");
        Ok(())
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// - Product not in cart: no-op
    /// - Positive quantity above the stock snapshot: `InsufficientStock`
    /// - Zero and negative quantities are stored as-is; the line stays
    /// - Returns larger than [`MAX_STOCK_QUANTITY`] units: `Validation`
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) else {
            return Ok(());
        };

        if quantity < -MAX_STOCK_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: -MAX_STOCK_QUANTITY,
                max: item.stock,
            }
            .into());
        }

        if quantity > 0 && quantity > item.stock {
            return Err(item.insufficient(quantity));
        }

        item.quantity = quantity;
        debug!(product_id, quantity, "Set cart line quantity");
        Ok(())
    }

    /// Removes a line. Missing products are ignored.
    pub fn remove_item(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Σ `unit_price × quantity`, unrounded. Negative lines subtract.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.get(product_id).is_some()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of line quantities (refund lines subtract).
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, name: &str, price_cents: i64, quantity: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            barcode: Some(format!("896400000{:04}", id.len())),
            category: Category::Tablet,
            quantity,
            purchase_price_cents: price_cents / 2,
            sale_price_cents: price_cents,
            description: None,
            formula_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_new_line_snapshots_stock() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 10);

        cart.add_or_increment(&panadol, 10).unwrap();

        let line = cart.get("p-1").unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.stock, 10);
        assert_eq!(line.unit_price_cents, 500);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 10);

        cart.add_or_increment(&panadol, 10).unwrap();
        cart.add_or_increment(&panadol, 10).unwrap();
        cart.add_or_increment(&panadol, 10).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal().cents(), 1500);
    }

    #[test]
    fn test_add_out_of_stock_is_rejected() {
        let mut cart = Cart::new();
        let brufen = test_product("p-2", "Brufen", 300, 0);

        let err = cart.add_or_increment(&brufen, 0).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { ref name } if name == "Brufen"));
        assert!(cart.is_empty());

        assert!(cart.add_or_increment(&brufen, -3).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increment_past_snapshot_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 2);

        cart.add_or_increment(&panadol, 2).unwrap();
        cart.add_or_increment(&panadol, 2).unwrap();
        let before = cart.clone();

        let err = cart.add_or_increment(&panadol, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_increment_ignores_new_stock_figure() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 1);

        cart.add_or_increment(&panadol, 1).unwrap();
        // The ledger now reports more stock, but the snapshot wins
        assert!(cart.add_or_increment(&panadol, 50).is_err());
        assert_eq!(cart.get("p-1").unwrap().stock, 1);
    }

    #[test]
    fn test_set_quantity_respects_snapshot() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 5);
        cart.add_or_increment(&panadol, 5).unwrap();

        cart.set_quantity("p-1", 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);

        let err = cart.set_quantity("p-1", 6).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 5, requested: 6, .. }
        ));
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_set_quantity_allows_zero_and_negative() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 5);
        cart.add_or_increment(&panadol, 5).unwrap();

        cart.set_quantity("p-1", 0).unwrap();
        assert!(cart.contains("p-1"));
        assert_eq!(cart.subtotal().cents(), 0);

        // A refund of 20 units ignores the 5-unit ceiling
        cart.set_quantity("p-1", -20).unwrap();
        assert_eq!(cart.total_quantity(), -20);
        assert_eq!(cart.subtotal().cents(), -10_000);
    }

    #[test]
    fn test_set_quantity_bounds_refunds() {
        let mut cart = Cart::new();
        let panadol = test_product("p-1", "Panadol", 500, 5);
        cart.add_or_increment(&panadol, 5).unwrap();
        cart.set_quantity("p-1", -2).unwrap();

        cart.set_quantity("p-1", -MAX_STOCK_QUANTITY).unwrap();
        assert_eq!(cart.subtotal().cents(), -500 * MAX_STOCK_QUANTITY);

        let err = cart
            .set_quantity("p-1", -20_000_000_000_000_000)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "quantity"
        ));
        assert_eq!(cart.total_quantity(), -MAX_STOCK_QUANTITY);
        assert_eq!(cart.subtotal().cents(), -500 * MAX_STOCK_QUANTITY);
    }

    #[test]
    fn test_set_quantity_on_missing_product_is_noop() {
        let mut cart = Cart::new();
        cart.set_quantity("missing", 3).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add_or_increment(&test_product("p-1", "Panadol", 500, 5), 5)
            .unwrap();
        cart.add_or_increment(&test_product("p-2", "Brufen", 300, 5), 5)
            .unwrap();

        cart.remove_item("p-1");
        cart.remove_item("not-there");
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].product_id, "p-2");

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = Cart::new();
        for id in ["p-3", "p-1", "p-2"] {
            cart.add_or_increment(&test_product(id, id, 100, 5), 5).unwrap();
        }
        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, ["p-3", "p-1", "p-2"]);
    }
}
