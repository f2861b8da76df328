//! # Multi-Cart Session
//!
//! Several independent carts held open by one register, exactly one of them
//! active. Lets a cashier park a customer who forgot something and serve the
//! next one.
//!
//! ```text
//!   carts:   [ Cart 0 ] [ Cart 1 ] [ Cart 2 ]
//!                          ▲
//!   active_index ──────────┘          discount: 10% (shared)
//! ```
//!
//! ## Invariants
//! - There is always at least one cart
//! - `active_index < carts.len()`
//! - The discount applies to whichever cart is active; it is reset by a
//!   successful checkout or a manual clear, never by switching

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::types::{DiscountRate, Order};
use crate::MAX_OPEN_CARTS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MultiCartSession {
    carts: Vec<Cart>,
    active_index: usize,
    discount: DiscountRate,
    /// Most recent order committed from this session, for the receipt.
    last_order: Option<Order>,
}

impl MultiCartSession {
    /// Creates a session with one empty cart.
    pub fn new() -> Self {
        MultiCartSession {
            carts: vec![Cart::new()],
            active_index: 0,
            discount: DiscountRate::zero(),
            last_order: None,
        }
    }

    /// Appends an empty cart and makes it active.
    pub fn add_cart(&mut self) -> CoreResult<usize> {
        if self.carts.len() >= MAX_OPEN_CARTS {
            return Err(CoreError::TooManyCarts {
                max: MAX_OPEN_CARTS,
            });
        }

        self.carts.push(Cart::new());
        self.active_index = self.carts.len() - 1;
        debug!(active_index = self.active_index, "Opened cart");
        Ok(self.active_index)
    }

    /// Makes the cart at `index` active. Indices past the end select the
    /// last cart.
    pub fn switch_to(&mut self, index: usize) {
        self.active_index = index.min(self.carts.len() - 1);
        debug!(active_index = self.active_index, "Switched cart");
    }

    /// Deletes the cart at `index`.
    ///
    /// ## Behavior
    /// - Only one cart open: it is cleared in place and the discount resets
    /// - Out-of-range index: ignored
    /// - Cart before the active one: active index shifts down so the same
    ///   cart stays active
    /// - The active cart itself: the cart sliding into its slot becomes
    ///   active (or the new last cart)
    pub fn delete_cart(&mut self, index: usize) {
        if self.carts.len() == 1 {
            self.clear_active();
            return;
        }

        if index >= self.carts.len() {
            return;
        }

        self.carts.remove(index);
        if index < self.active_index {
            self.active_index -= 1;
        } else {
            self.active_index = self.active_index.min(self.carts.len() - 1);
        }
        debug!(index, active_index = self.active_index, "Deleted cart");
    }

    /// Clears the active cart and resets the discount.
    pub fn clear_active(&mut self) {
        self.active_cart_mut().clear();
        self.discount = DiscountRate::zero();
    }

    pub fn set_discount(&mut self, discount: DiscountRate) {
        self.discount = discount;
    }

    pub fn discount(&self) -> DiscountRate {
        self.discount
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_cart(&self) -> &Cart {
        &self.carts[self.active_index]
    }

    pub fn active_cart_mut(&mut self) -> &mut Cart {
        &mut self.carts[self.active_index]
    }

    pub fn carts(&self) -> &[Cart] {
        &self.carts
    }

    pub fn cart_count(&self) -> usize {
        self.carts.len()
    }

    pub fn last_order(&self) -> Option<&Order> {
        self.last_order.as_ref()
    }

    /// Applies a committed checkout: clears the cart at `cart_index`, resets
    /// the discount and records the order.
    ///
    /// The index is the cart that was checked out, which is still the active
    /// one because the register holds the session lock across the commit.
    pub(crate) fn complete_checkout(&mut self, cart_index: usize, order: Order) {
        if let Some(cart) = self.carts.get_mut(cart_index) {
            cart.clear();
        }
        self.discount = DiscountRate::zero();
        self.last_order = Some(order);
    }
}

impl Default for MultiCartSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Product};
    use chrono::Utc;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_uppercase(),
            barcode: None,
            category: Category::Syrup,
            quantity: 10,
            purchase_price_cents: 100,
            sale_price_cents: 200,
            description: None,
            formula_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Session with `n` carts, cart `i` holding one line `p-i`.
    fn session_with(n: usize) -> MultiCartSession {
        let mut session = MultiCartSession::new();
        for i in 0..n {
            if i > 0 {
                session.add_cart().unwrap();
            }
            session
                .active_cart_mut()
                .add_or_increment(&product(&format!("p-{i}")), 10)
                .unwrap();
        }
        session
    }

    fn active_marker(session: &MultiCartSession) -> &str {
        &session.active_cart().items()[0].product_id
    }

    #[test]
    fn test_new_session_has_one_empty_cart() {
        let session = MultiCartSession::new();
        assert_eq!(session.cart_count(), 1);
        assert_eq!(session.active_index(), 0);
        assert!(session.active_cart().is_empty());
        assert!(session.discount().is_zero());
        assert!(session.last_order().is_none());
    }

    #[test]
    fn test_add_cart_activates_it() {
        let mut session = MultiCartSession::new();
        assert_eq!(session.add_cart().unwrap(), 1);
        assert_eq!(session.active_index(), 1);
        assert_eq!(session.cart_count(), 2);
    }

    #[test]
    fn test_add_cart_is_capped() {
        let mut session = MultiCartSession::new();
        for _ in 1..MAX_OPEN_CARTS {
            session.add_cart().unwrap();
        }
        assert!(matches!(
            session.add_cart(),
            Err(CoreError::TooManyCarts { .. })
        ));
        assert_eq!(session.cart_count(), MAX_OPEN_CARTS);
    }

    #[test]
    fn test_switch_clamps_and_keeps_discount() {
        let mut session = session_with(3);
        session.set_discount(DiscountRate::from_percent(10));

        session.switch_to(0);
        assert_eq!(active_marker(&session), "p-0");

        session.switch_to(99);
        assert_eq!(session.active_index(), 2);
        assert_eq!(session.discount(), DiscountRate::from_percent(10));
    }

    #[test]
    fn test_delete_only_cart_clears_it() {
        let mut session = session_with(1);
        session.set_discount(DiscountRate::from_percent(5));

        session.delete_cart(0);

        assert_eq!(session.cart_count(), 1);
        assert!(session.active_cart().is_empty());
        assert!(session.discount().is_zero());
    }

    #[test]
    fn test_delete_before_active_keeps_same_cart_active() {
        // Carts [A, B, C], active = C (2). Deleting A leaves [B, C], active C.
        let mut session = session_with(3);
        session.delete_cart(0);

        assert_eq!(session.cart_count(), 2);
        assert_eq!(session.active_index(), 1);
        assert_eq!(active_marker(&session), "p-2");
    }

    #[test]
    fn test_delete_active_activates_neighbour() {
        let mut session = session_with(3);
        session.switch_to(1);
        session.delete_cart(1);
        assert_eq!(active_marker(&session), "p-2");

        // Deleting the active last cart falls back to the new last cart
        let mut session = session_with(3);
        session.delete_cart(2);
        assert_eq!(session.active_index(), 1);
        assert_eq!(active_marker(&session), "p-1");
    }

    #[test]
    fn test_delete_after_active_keeps_index() {
        let mut session = session_with(3);
        session.switch_to(0);
        session.delete_cart(2);
        assert_eq!(session.active_index(), 0);
        assert_eq!(active_marker(&session), "p-0");
    }

    #[test]
    fn test_delete_out_of_range_is_ignored() {
        let mut session = session_with(2);
        session.delete_cart(7);
        assert_eq!(session.cart_count(), 2);
        assert_eq!(session.active_index(), 1);
    }

    #[test]
    fn test_clear_active_resets_discount_only_for_active_cart() {
        let mut session = session_with(2);
        session.set_discount(DiscountRate::from_percent(15));

        session.clear_active();

        assert!(session.active_cart().is_empty());
        assert!(!session.carts()[0].is_empty());
        assert!(session.discount().is_zero());
    }
}
