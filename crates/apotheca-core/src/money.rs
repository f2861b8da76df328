//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paisa / cents)                      │
//! │    Every price, line total and discount is an i64 of minor units.       │
//! │    Rounding happens in exactly two places (see below).                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Receipt Rounding
//! Checkout totals are rounded to the nearest whole currency unit, half
//! toward positive infinity, in this order:
//! ```text
//! subtotal (exact)  ──round_to_unit()──►  raw total
//! raw total × discount% ──discount_amount()──► discount (whole units)
//! final = raw total − discount
//! ```
//! The discount is derived from the ROUNDED raw total, never from the
//! unrounded sum of lines. Receipts depend on this exact order.
//!
//! ## Usage
//! ```rust
//! use apotheca_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let doubled = price * 2;             // 21.98
//! assert_eq!(doubled.round_to_unit().cents(), 2200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::DiscountRate;

/// Minor units per whole currency unit.
pub const MINOR_UNITS: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds surface as negative line totals and totals
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// let price = Money::from_cents(500); // 5.00
    /// assert_eq!(price.cents(), 500);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * MINOR_UNITS)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / MINOR_UNITS
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % MINOR_UNITS).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a (possibly negative) quantity.
    ///
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(500);
    /// assert_eq!(unit_price.multiply_quantity(-1).cents(), -500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Rounds to the nearest whole currency unit, halves toward +∞.
    ///
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1449).round_to_unit().cents(), 1400);
    /// assert_eq!(Money::from_cents(1450).round_to_unit().cents(), 1500);
    /// assert_eq!(Money::from_cents(-150).round_to_unit().cents(), -100);
    /// ```
    pub fn round_to_unit(&self) -> Money {
        let units = div_round_half_up(self.0 as i128, MINOR_UNITS as i128);
        Money::from_units(units as i64)
    }

    /// Computes the discount on this amount, rounded to whole units.
    ///
    /// `self` is expected to be an already-rounded raw total. The result is
    /// `round(raw × percent / 100)` expressed in minor units.
    ///
    /// ```rust
    /// use apotheca_core::money::Money;
    /// use apotheca_core::types::DiscountRate;
    ///
    /// let raw = Money::from_units(15);
    /// let discount = raw.discount_amount(DiscountRate::from_percent(10));
    /// assert_eq!(discount.cents(), 200); // round(1.5) = 2
    /// ```
    pub fn discount_amount(&self, rate: DiscountRate) -> Money {
        // cents × bps / (10_000 bps × 100 minor units) = whole units
        let units = div_round_half_up(
            self.0 as i128 * rate.bps() as i128,
            10_000 * MINOR_UNITS as i128,
        );
        Money::from_units(units as i64)
    }
}

/// `round(numerator / denominator)` with halves toward +∞.
///
/// `denominator` must be positive.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    (2 * numerator + denominator).div_euclid(2 * denominator)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering; the register adds the currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-50).to_string(), "-0.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, -b].into_iter().sum();
        assert_eq!(total.cents(), 1000);
    }

    #[test]
    fn test_round_to_unit_halves_go_up() {
        assert_eq!(Money::from_cents(1449).round_to_unit().cents(), 1400);
        assert_eq!(Money::from_cents(1450).round_to_unit().cents(), 1500);
        assert_eq!(Money::from_cents(1500).round_to_unit().cents(), 1500);
        // Negative halves move toward +∞ as well
        assert_eq!(Money::from_cents(-150).round_to_unit().cents(), -100);
        assert_eq!(Money::from_cents(-151).round_to_unit().cents(), -200);
    }

    #[test]
    fn test_discount_amount() {
        let raw = Money::from_units(15);
        assert_eq!(raw.discount_amount(DiscountRate::from_percent(10)).cents(), 200);

        let raw = Money::from_units(100);
        assert_eq!(raw.discount_amount(DiscountRate::from_percent(110)).cents(), 11000);
        assert_eq!(raw.discount_amount(DiscountRate::zero()).cents(), 0);

        // 12.5% of 99 = 12.375 → 12
        let raw = Money::from_units(99);
        assert_eq!(raw.discount_amount(DiscountRate::from_bps(1250)).cents(), 1200);
    }

    #[test]
    fn test_discount_on_negative_total() {
        // Refund cart: -15 at 10% → round(-1.5) = -1
        let raw = Money::from_units(-15);
        assert_eq!(raw.discount_amount(DiscountRate::from_percent(10)).cents(), -100);
    }
}
