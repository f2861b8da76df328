//! # Cart Commands
//!
//! Commands that edit the register's carts.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│ Receipt  │       │
//! │  │  Cart    │     │          │     │          │     │          │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                   │            │
//! │                   add_to_cart / scan                       │            │
//! │                   set_quantity                             ▼            │
//! │                   remove_from_cart              cart emptied in place   │
//! │                   set_discount                                          │
//! │                        │                                                │
//! │   new_cart / switch_cart / delete_cart: park a customer, serve the next │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command answers with a fresh [`SessionView`]. Per-row figures such
//! as remaining stock are derived from the cart each time, never stored.

use apotheca_core::validation::validate_discount;
use apotheca_core::{
    Cart, CartLineItem, CheckoutState, CheckoutTotals, DiscountRate, MultiCartSession,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, RegisterSession, SessionState};

/// One row of the cart display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Stock snapshot taken when the product was added.
    pub stock: i64,
    /// `stock - quantity`. Negative means checkout will be refused.
    pub remaining: i64,
}

impl From<&CartLineItem> for CartLineView {
    fn from(item: &CartLineItem) -> Self {
        CartLineView {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.line_total().cents(),
            stock: item.stock,
            remaining: item.stock - item.quantity,
        }
    }
}

/// The active cart with a totals preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub index: usize,
    pub items: Vec<CartLineView>,
    pub item_count: usize,
    pub total_quantity: i64,
    /// What checkout would compute right now.
    pub totals: CheckoutTotals,
}

impl CartView {
    fn build(index: usize, cart: &Cart, discount: DiscountRate) -> Self {
        CartView {
            index,
            items: cart.items().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            totals: CheckoutTotals::compute(cart.subtotal(), discount),
        }
    }
}

/// One tab in the cart switcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub index: usize,
    pub item_count: usize,
    pub subtotal_cents: i64,
    pub active: bool,
}

/// Everything the register screen shows about its carts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub carts: Vec<CartSummary>,
    pub active: CartView,
    pub discount: DiscountRate,
    pub checkout_state: CheckoutState,
}

impl SessionView {
    pub fn build(session: &RegisterSession) -> Self {
        let carts: &MultiCartSession = &session.carts;
        let active_index = carts.active_index();

        SessionView {
            carts: carts
                .carts()
                .iter()
                .enumerate()
                .map(|(index, cart)| CartSummary {
                    index,
                    item_count: cart.item_count(),
                    subtotal_cents: cart.subtotal().cents(),
                    active: index == active_index,
                })
                .collect(),
            active: CartView::build(active_index, carts.active_cart(), carts.discount()),
            discount: carts.discount(),
            checkout_state: session.engine.state(),
        }
    }
}

/// Gets the current carts.
pub async fn get_session(session: &SessionState) -> SessionView {
    debug!("get_session command");
    SessionView::build(&*session.lock().await)
}

/// Adds one unit of a product to the active cart.
///
/// ## Behavior
/// - Already in cart: quantity + 1, capped by the stock snapshot
/// - New line: snapshot of name, price and quantity on hand right now
/// - Out of stock: refused, cart unchanged
pub async fn add_to_cart(
    db: &DbState,
    session: &SessionState,
    product_id: &str,
) -> ApiResult<SessionView> {
    debug!(product_id = %product_id, "add_to_cart command");

    let product = db
        .inner()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    let mut session = session.lock().await;
    session.require_user()?;
    session
        .carts
        .active_cart_mut()
        .add_or_increment(&product, product.quantity)?;

    Ok(SessionView::build(&session))
}

/// Adds the product with this barcode.
pub async fn scan(db: &DbState, session: &SessionState, barcode: &str) -> ApiResult<SessionView> {
    let barcode = barcode.trim();
    debug!(barcode = %barcode, "scan command");

    let mut hits = db.inner().products().find_by_barcode(barcode).await?;
    let product = match hits.len() {
        0 => return Err(ApiError::not_found("Barcode", barcode)),
        1 => hits.remove(0),
        n => {
            return Err(ApiError::validation(format!(
                "Barcode {barcode} matches {n} products, pick one from search"
            )))
        }
    };

    let mut session = session.lock().await;
    session.require_user()?;
    session
        .carts
        .active_cart_mut()
        .add_or_increment(&product, product.quantity)?;

    Ok(SessionView::build(&session))
}

/// Sets a line's quantity. Negative quantities mark returned units.
pub async fn set_quantity(
    session: &SessionState,
    product_id: &str,
    quantity: i64,
) -> ApiResult<SessionView> {
    debug!(product_id = %product_id, quantity, "set_quantity command");

    let mut session = session.lock().await;
    session.require_user()?;
    session
        .carts
        .active_cart_mut()
        .set_quantity(product_id, quantity)?;

    Ok(SessionView::build(&session))
}

pub async fn remove_from_cart(session: &SessionState, product_id: &str) -> ApiResult<SessionView> {
    debug!(product_id = %product_id, "remove_from_cart command");

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.active_cart_mut().remove_item(product_id);

    Ok(SessionView::build(&session))
}

/// Empties the active cart and resets the discount.
pub async fn clear_cart(session: &SessionState) -> ApiResult<SessionView> {
    debug!("clear_cart command");

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.clear_active();

    Ok(SessionView::build(&session))
}

/// Opens another cart and makes it active.
pub async fn new_cart(session: &SessionState) -> ApiResult<SessionView> {
    debug!("new_cart command");

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.add_cart()?;

    Ok(SessionView::build(&session))
}

/// Switches carts. Out-of-range indices select the last cart.
pub async fn switch_cart(session: &SessionState, index: usize) -> ApiResult<SessionView> {
    debug!(index, "switch_cart command");

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.switch_to(index);

    Ok(SessionView::build(&session))
}

/// Deletes a cart. The last remaining cart is emptied instead.
pub async fn delete_cart(session: &SessionState, index: usize) -> ApiResult<SessionView> {
    debug!(index, "delete_cart command");

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.delete_cart(index);

    Ok(SessionView::build(&session))
}

/// Sets the discount from operator input such as `"10"` or `"12.5%"`.
///
/// Rates above 100% are accepted and turn the cart into a refund.
pub async fn set_discount(session: &SessionState, input: &str) -> ApiResult<SessionView> {
    debug!(input = %input, "set_discount command");

    let rate: DiscountRate = input.parse()?;
    validate_discount(rate)?;

    let mut session = session.lock().await;
    session.require_user()?;
    session.carts.set_discount(rate);

    Ok(SessionView::build(&session))
}
