//! # Checkout Engine
//!
//! Validates the active cart, prices it and commits it through an
//! [`OrderStore`].
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │        ┌──────┐  begin()   ┌────────────┐  lines ok   ┌────────────┐   │
//! │   ┌───►│ Idle │──────────►│ Validating │────────────►│ Committing │   │
//! │   │    └──────┘            └─────┬──────┘             └─────┬──────┘   │
//! │   │                              │ empty cart /             │          │
//! │   │                              │ stock exceeded           │          │
//! │   │                              ▼                 store ok │ store err│
//! │   │                        ┌──────────┐◄────────────────────┼──────────┘
//! │   ├────────────────────────│ Rejected │                     │          │
//! │   │                        └──────────┘                     ▼          │
//! │   │                                                  ┌───────────┐     │
//! │   └──────────────────────────────────────────────────│ Completed │     │
//! │                                                      └───────────┘     │
//! │                                                                         │
//! │  begin() while Committing ──► CheckoutInProgress                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! raw_total       = round(subtotal)
//! discount_amount = round(raw_total × discount / 100)
//! final_total     = raw_total − discount_amount
//! is_refund       = final_total < 0
//! ```
//! A refund skips the stock ceiling: returned goods go back on the shelf.
//!
//! ## Atomicity
//! The cart and discount are only touched after the store has confirmed the
//! order. A rejected checkout, at any stage, leaves the session as it was.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::auth::UserSession;
use crate::cart::CartLineItem;
use crate::error::{CoreError, CoreResult, PersistenceError};
use crate::money::Money;
use crate::session::MultiCartSession;
use crate::types::{DiscountRate, Order, OrderItem};

// =============================================================================
// Order Store Seam
// =============================================================================

/// Durable sink for committed checkouts.
///
/// Implementations must persist the order and adjust every product's
/// quantity on hand by `-line.quantity` as one atomic unit: either both
/// happen or neither does.
pub trait OrderStore {
    fn commit_order(
        &self,
        request: OrderRequest,
    ) -> impl Future<Output = Result<Order, PersistenceError>> + Send;
}

/// A cart line as sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    /// Negative for refunded units.
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

impl From<&CartLineItem> for OrderLine {
    fn from(item: &CartLineItem) -> Self {
        OrderLine {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
        }
    }
}

/// Priced totals of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutTotals {
    /// Exact sum of line totals.
    pub subtotal: Money,
    /// Subtotal rounded to whole units.
    pub raw_total: Money,
    pub discount_rate: DiscountRate,
    pub discount_amount: Money,
    pub final_total: Money,
    pub is_refund: bool,
}

impl CheckoutTotals {
    /// Prices a subtotal under a discount.
    ///
    /// ```rust
    /// use apotheca_core::checkout::CheckoutTotals;
    /// use apotheca_core::money::Money;
    /// use apotheca_core::types::DiscountRate;
    ///
    /// // 3 × Panadol at 5.00, 10% off
    /// let totals = CheckoutTotals::compute(Money::from_units(15), DiscountRate::from_percent(10));
    /// assert_eq!(totals.discount_amount, Money::from_units(2));
    /// assert_eq!(totals.final_total, Money::from_units(13));
    /// assert!(!totals.is_refund);
    /// ```
    pub fn compute(subtotal: Money, discount_rate: DiscountRate) -> Self {
        let raw_total = subtotal.round_to_unit();
        let discount_amount = raw_total.discount_amount(discount_rate);
        let final_total = raw_total - discount_amount;

        CheckoutTotals {
            subtotal,
            raw_total,
            discount_rate,
            discount_amount,
            final_total,
            is_refund: final_total.is_negative(),
        }
    }
}

/// Everything the store needs to persist one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRequest {
    pub user_id: String,
    /// Cart lines in display order, zero-quantity lines included.
    pub lines: Vec<OrderLine>,
    pub totals: CheckoutTotals,
}

impl OrderRequest {
    /// Builds the immutable order record a store hands back.
    pub fn into_order(
        self,
        id: String,
        receipt_number: String,
        created_at: DateTime<Utc>,
    ) -> Order {
        let items = self
            .lines
            .iter()
            .enumerate()
            .map(|(position, line)| OrderItem {
                id: format!("{id}-{position:03}"),
                order_id: id.clone(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total().cents(),
            })
            .collect();

        Order {
            id,
            receipt_number,
            user_id: self.user_id,
            raw_total_cents: self.totals.raw_total.cents(),
            discount_bps: self.totals.discount_rate.bps(),
            discount_cents: self.totals.discount_amount.cents(),
            total_cents: self.totals.final_total.cents(),
            is_refund: self.totals.is_refund,
            created_at,
            items,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    Committing,
    Completed,
    Rejected,
}

/// A validated checkout waiting for the store.
///
/// Returned by [`CheckoutEngine::begin`] and consumed by
/// [`CheckoutEngine::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheckout {
    cart_index: usize,
    request: OrderRequest,
}

impl PendingCheckout {
    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    pub fn totals(&self) -> &CheckoutTotals {
        &self.request.totals
    }
}

/// Detail of the last terminal transition, for the operator's status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CheckoutOutcome {
    Completed { receipt_number: String },
    Rejected { reason: String },
}

/// Drives one register's checkouts.
#[derive(Debug, Default)]
pub struct CheckoutEngine {
    state: CheckoutState,
    last_outcome: Option<CheckoutOutcome>,
}

impl CheckoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state. `Completed` and `Rejected` hold until the next
    /// [`begin`](Self::begin) or [`reset`](Self::reset).
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Returns a finished engine to `Idle`. A committing checkout is left
    /// alone.
    pub fn reset(&mut self) {
        if self.state != CheckoutState::Committing {
            self.state = CheckoutState::Idle;
        }
    }

    pub fn last_outcome(&self) -> Option<&CheckoutOutcome> {
        self.last_outcome.as_ref()
    }

    /// Validates and prices the active cart.
    ///
    /// On success the engine is `Committing` and the caller must hand the
    /// store's answer to [`finish`](Self::finish).
    pub fn begin(
        &mut self,
        session: &MultiCartSession,
        user: &UserSession,
    ) -> CoreResult<PendingCheckout> {
        if self.state == CheckoutState::Committing {
            return Err(CoreError::CheckoutInProgress);
        }

        self.reset();
        self.state = CheckoutState::Validating;
        let cart = session.active_cart();

        if cart.is_empty() {
            return Err(self.reject(CoreError::EmptyCart));
        }

        let totals = CheckoutTotals::compute(cart.subtotal(), session.discount());

        if !totals.is_refund {
            if let Some(item) = cart.items().iter().find(|i| i.exceeds_stock()) {
                return Err(self.reject(CoreError::InsufficientStock {
                    name: item.name.clone(),
                    available: item.stock,
                    requested: item.quantity,
                }));
            }
        }

        debug!(
            cart_index = session.active_index(),
            lines = cart.item_count(),
            raw_total = %totals.raw_total,
            discount = %totals.discount_rate,
            final_total = %totals.final_total,
            is_refund = totals.is_refund,
            "Checkout validated"
        );

        self.state = CheckoutState::Committing;
        Ok(PendingCheckout {
            cart_index: session.active_index(),
            request: OrderRequest {
                user_id: user.user_id.clone(),
                lines: cart.items().iter().map(OrderLine::from).collect(),
                totals,
            },
        })
    }

    /// Applies the store's answer to a pending checkout.
    ///
    /// On success the checked-out cart is cleared, the discount resets and
    /// the order becomes the session's last order. On failure nothing in the
    /// session changes.
    pub fn finish(
        &mut self,
        session: &mut MultiCartSession,
        pending: PendingCheckout,
        committed: Result<Order, PersistenceError>,
    ) -> CoreResult<Order> {
        match committed {
            Ok(order) => {
                info!(
                    order_id = %order.id,
                    receipt = %order.receipt_number,
                    total = %order.total(),
                    is_refund = order.is_refund,
                    "Checkout completed"
                );
                session.complete_checkout(pending.cart_index, order.clone());
                self.state = CheckoutState::Completed;
                self.last_outcome = Some(CheckoutOutcome::Completed {
                    receipt_number: order.receipt_number.clone(),
                });
                Ok(order)
            }
            Err(err) => Err(self.reject(CoreError::Persistence(err))),
        }
    }

    /// Runs a whole checkout against `store`.
    pub async fn checkout<S: OrderStore>(
        &mut self,
        session: &mut MultiCartSession,
        store: &S,
        user: &UserSession,
    ) -> CoreResult<Order> {
        let pending = self.begin(session, user)?;
        let committed = store.commit_order(pending.request.clone()).await;
        self.finish(session, pending, committed)
    }

    fn reject(&mut self, err: CoreError) -> CoreError {
        warn!(error = %err, "Checkout rejected");
        self.state = CheckoutState::Rejected;
        self.last_outcome = Some(CheckoutOutcome::Rejected {
            reason: err.to_string(),
        });
        err
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::types::{Category, Product};
    use std::sync::Mutex;

    /// Records every request; optionally fails.
    #[derive(Default)]
    struct RecordingStore {
        requests: Mutex<Vec<OrderRequest>>,
        failure: Option<String>,
    }

    impl RecordingStore {
        fn failing(message: &str) -> Self {
            RecordingStore {
                failure: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last(&self) -> OrderRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl OrderStore for RecordingStore {
        async fn commit_order(&self, request: OrderRequest) -> Result<Order, PersistenceError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.failure {
                Some(message) => Err(PersistenceError::new(message.clone())),
                None => {
                    let n = self.calls();
                    Ok(request.into_order(
                        format!("order-{n}"),
                        format!("20240101-{n:04}"),
                        Utc::now(),
                    ))
                }
            }
        }
    }

    fn cashier() -> UserSession {
        UserSession {
            user_id: "user-1".to_string(),
            username: "cashier".to_string(),
            full_name: "Front Counter".to_string(),
            role: Role::Cashier,
            started_at: Utc::now(),
        }
    }

    fn product(id: &str, name: &str, price_cents: i64, quantity: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            barcode: None,
            category: Category::Tablet,
            quantity,
            purchase_price_cents: 0,
            sale_price_cents: price_cents,
            description: None,
            formula_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// 3 × Panadol (5.00, 10 on hand) at 10% off.
    fn panadol_session() -> MultiCartSession {
        let panadol = product("p-1", "Panadol", 500, 10);
        let mut session = MultiCartSession::new();
        for _ in 0..3 {
            session
                .active_cart_mut()
                .add_or_increment(&panadol, panadol.quantity)
                .unwrap();
        }
        session.set_discount(DiscountRate::from_percent(10));
        session
    }

    #[test]
    fn test_totals_round_raw_before_discount() {
        // 14.50 rounds to 15; 10% of 15 = 1.5 → 2
        let totals = CheckoutTotals::compute(Money::from_cents(1450), DiscountRate::from_percent(10));
        assert_eq!(totals.raw_total.cents(), 1500);
        assert_eq!(totals.discount_amount.cents(), 200);
        assert_eq!(totals.final_total.cents(), 1300);

        let totals = CheckoutTotals::compute(Money::from_cents(1449), DiscountRate::zero());
        assert_eq!(totals.final_total.cents(), 1400);
    }

    #[test]
    fn test_totals_refund_when_discount_exceeds_total() {
        let totals = CheckoutTotals::compute(Money::from_units(100), DiscountRate::from_percent(110));
        assert_eq!(totals.discount_amount, Money::from_units(110));
        assert_eq!(totals.final_total, Money::from_units(-10));
        assert!(totals.is_refund);
    }

    #[tokio::test]
    async fn test_checkout_panadol_with_discount() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = panadol_session();

        let order = engine
            .checkout(&mut session, &store, &cashier())
            .await
            .unwrap();

        assert_eq!(order.raw_total_cents, 1500);
        assert_eq!(order.discount_cents, 200);
        assert_eq!(order.total_cents, 1300);
        assert!(!order.is_refund);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.items[0].line_total_cents, 1500);

        let request = store.last();
        assert_eq!(request.user_id, "user-1");
        assert_eq!(request.lines[0].product_id, "p-1");

        assert!(session.active_cart().is_empty());
        assert!(session.discount().is_zero());
        assert_eq!(session.last_order(), Some(&order));
        assert_eq!(engine.state(), CheckoutState::Completed);
        assert!(matches!(
            engine.last_outcome(),
            Some(CheckoutOutcome::Completed { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_store() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = MultiCartSession::new();

        let err = engine
            .checkout(&mut session, &store, &cashier())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::EmptyCart));
        assert_eq!(store.calls(), 0);
        assert_eq!(engine.state(), CheckoutState::Rejected);
    }

    #[tokio::test]
    async fn test_stale_snapshot_rejects_without_touching_cart() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = MultiCartSession::new();
        let syrup = product("p-2", "Hydryllin", 250, 5);
        session.active_cart_mut().add_or_increment(&syrup, 5).unwrap();
        session.set_discount(DiscountRate::from_percent(5));

        session.active_cart_mut().set_quantity("p-2", 4).unwrap();

        // A snapshot that has fallen below the line quantity can only come
        // from a restored session, so forge one through serde
        let mut value = serde_json::to_value(&session).unwrap();
        value["carts"][0]["items"][0]["stock"] = serde_json::json!(3);
        let mut forged: MultiCartSession = serde_json::from_value(value).unwrap();
        let before = forged.clone();

        let err = engine
            .checkout(&mut forged, &store, &cashier())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock { ref name, available: 3, requested: 4 } if name == "Hydryllin"
        ));
        assert_eq!(forged, before);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_refund_skips_stock_ceiling() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = MultiCartSession::new();
        let inhaler = product("p-3", "Ventolin", 10_000, 3);
        for _ in 0..3 {
            session.active_cart_mut().add_or_increment(&inhaler, 3).unwrap();
        }
        session.set_discount(DiscountRate::from_percent(110));

        // 3 in the cart against a snapshot of 1
        let mut value = serde_json::to_value(&session).unwrap();
        value["carts"][0]["items"][0]["stock"] = serde_json::json!(1);
        let mut forged: MultiCartSession = serde_json::from_value(value).unwrap();
        assert!(forged.active_cart().items()[0].exceeds_stock());

        let order = engine
            .checkout(&mut forged, &store, &cashier())
            .await
            .unwrap();

        // raw 300, discount 330
        assert_eq!(order.total_cents, -3_000);
        assert!(order.is_refund);
        assert_eq!(store.calls(), 1);
        assert_eq!(store.last().lines[0].quantity, 3);
        assert_eq!(engine.state(), CheckoutState::Completed);
    }

    #[tokio::test]
    async fn test_oversold_line_without_refund_is_rejected() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = MultiCartSession::new();
        let inhaler = product("p-3", "Ventolin", 10_000, 3);
        for _ in 0..3 {
            session.active_cart_mut().add_or_increment(&inhaler, 3).unwrap();
        }
        session.set_discount(DiscountRate::from_percent(50));

        let mut value = serde_json::to_value(&session).unwrap();
        value["carts"][0]["items"][0]["stock"] = serde_json::json!(1);
        let mut forged: MultiCartSession = serde_json::from_value(value).unwrap();

        let err = engine
            .checkout(&mut forged, &store, &cashier())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::InsufficientStock { available: 1, requested: 3, .. }));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_negative_line_checks_out_as_refund() {
        let store = RecordingStore::default();
        let mut engine = CheckoutEngine::new();
        let mut session = MultiCartSession::new();
        let drops = product("p-4", "Otosporin", 400, 2);
        session.active_cart_mut().add_or_increment(&drops, 2).unwrap();
        session.active_cart_mut().set_quantity("p-4", -3).unwrap();

        let order = engine
            .checkout(&mut session, &store, &cashier())
            .await
            .unwrap();

        assert_eq!(order.total_cents, -1200);
        assert!(order.is_refund);
        assert_eq!(store.last().lines[0].quantity, -3);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_session_intact() {
        let store = RecordingStore::failing("database is locked");
        let mut engine = CheckoutEngine::new();
        let mut session = panadol_session();
        let before = session.clone();

        let err = engine
            .checkout(&mut session, &store, &cashier())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to commit order: database is locked");
        assert_eq!(session, before);
        assert_eq!(engine.state(), CheckoutState::Rejected);
        assert!(matches!(
            engine.last_outcome(),
            Some(CheckoutOutcome::Rejected { .. })
        ));
    }

    #[test]
    fn test_second_begin_while_committing_is_refused() {
        let mut engine = CheckoutEngine::new();
        let session = panadol_session();

        let pending = engine.begin(&session, &cashier()).unwrap();
        assert_eq!(engine.state(), CheckoutState::Committing);
        assert_eq!(pending.totals().final_total.cents(), 1300);

        assert!(matches!(
            engine.begin(&session, &cashier()),
            Err(CoreError::CheckoutInProgress)
        ));
        assert_eq!(engine.state(), CheckoutState::Committing);
    }

    #[test]
    fn test_finish_clears_the_checked_out_cart() {
        let mut engine = CheckoutEngine::new();
        let mut session = panadol_session();
        session.add_cart().unwrap();
        session.switch_to(0);

        let pending = engine.begin(&session, &cashier()).unwrap();
        let order = pending
            .request()
            .clone()
            .into_order("o-1".to_string(), "20240101-0001".to_string(), Utc::now());
        engine.finish(&mut session, pending, Ok(order)).unwrap();

        assert_eq!(session.cart_count(), 2);
        assert!(session.carts()[0].is_empty());
        assert_eq!(engine.state(), CheckoutState::Completed);

        engine.reset();
        assert_eq!(engine.state(), CheckoutState::Idle);
    }

    #[test]
    fn test_zero_quantity_lines_are_sent() {
        let mut engine = CheckoutEngine::new();
        let mut session = panadol_session();
        let brufen = product("p-5", "Brufen", 300, 4);
        session.active_cart_mut().add_or_increment(&brufen, 4).unwrap();
        session.active_cart_mut().set_quantity("p-5", 0).unwrap();

        let pending = engine.begin(&session, &cashier()).unwrap();
        let lines = &pending.request().lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].quantity, 0);
    }
}
