//! # Checkout Commands
//!
//! Checkout of the active cart and the receipt projection.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout()                                                            │
//! │     │                                                                   │
//! │     ├── lock SessionState (held across the commit)                     │
//! │     ├── CheckoutEngine::checkout(carts, OrderRepository, user)          │
//! │     │      validate ──► totals ──► commit_order ──► clear cart         │
//! │     ├── unlock                                                          │
//! │     ├── read Settings (store header, auto_print)                       │
//! │     └── Receipt::project(order) ──► render() ──► CheckoutResponse      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The receipt is pure formatting over a committed [`Order`]; printing is up
//! to the caller, guided by `print`.

use apotheca_core::{DiscountRate, Order, Settings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::{ConfigState, DbState, SessionState};

/// A receipt row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// Printable view of a committed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub store_address: String,
    pub store_phone: String,
    pub receipt_number: String,
    pub cashier: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    /// Sum of line totals before rounding.
    pub subtotal_cents: i64,
    pub raw_total_cents: i64,
    pub discount: DiscountRate,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub is_refund: bool,
}

impl Receipt {
    /// Projects an order onto the store's receipt layout.
    pub fn project(order: &Order, settings: &Settings, cashier: &str) -> Self {
        let lines: Vec<ReceiptLine> = order
            .items
            .iter()
            .map(|item| ReceiptLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: item.line_total_cents,
            })
            .collect();

        Receipt {
            store_name: settings.store_name.clone(),
            store_address: settings.store_address.clone(),
            store_phone: settings.store_phone.clone(),
            receipt_number: order.receipt_number.clone(),
            cashier: cashier.to_string(),
            created_at: order.created_at,
            subtotal_cents: lines.iter().map(|l| l.line_total_cents).sum(),
            lines,
            raw_total_cents: order.raw_total_cents,
            discount: order.discount_rate(),
            discount_cents: order.discount_cents,
            total_cents: order.total_cents,
            is_refund: order.is_refund,
        }
    }

    /// Renders the receipt as fixed-width text.
    pub fn render(&self, config: &ConfigState) -> String {
        let width = config.receipt_width;
        let money = |cents: i64| config.format_currency(cents);
        let rule = "-".repeat(width);
        let mut out: Vec<String> = Vec::new();

        out.push(center(&self.store_name, width));
        for extra in [&self.store_address, &self.store_phone] {
            if !extra.is_empty() {
                out.push(center(extra, width));
            }
        }
        out.push(rule.clone());
        out.push(format!("Receipt: {}", self.receipt_number));
        out.push(format!("Date:    {}", self.created_at.format("%Y-%m-%d %H:%M UTC")));
        out.push(format!("Cashier: {}", self.cashier));
        out.push(rule.clone());

        for line in &self.lines {
            out.push(line.name.clone());
            out.push(columns(
                &format!("  {} x {}", line.quantity, money(line.unit_price_cents)),
                &money(line.line_total_cents),
                width,
            ));
        }
        out.push(rule.clone());

        out.push(columns("Subtotal", &money(self.subtotal_cents), width));
        let rounding = self.raw_total_cents - self.subtotal_cents;
        if rounding != 0 {
            out.push(columns("Rounding", &money(rounding), width));
        }
        if !self.discount.is_zero() {
            out.push(columns(
                &format!("Discount ({})", self.discount),
                &money(-self.discount_cents),
                width,
            ));
        }
        let total_label = if self.is_refund { "REFUND" } else { "TOTAL" };
        out.push(columns(total_label, &money(self.total_cents), width));
        out.push(rule);

        if self.is_refund {
            out.push(center("*** REFUND ***", width));
        }
        out.push(center("Thank you, get well soon", width));

        out.join("\n")
    }
}

fn center(text: &str, width: usize) -> String {
    format!("{:^width$}", text, width = width)
        .trim_end()
        .to_string()
}

fn columns(left: &str, right: &str, width: usize) -> String {
    let pad = width.saturating_sub(right.chars().count());
    format!("{:<pad$}{}", left, right, pad = pad)
}

/// Result of a checkout or reprint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub receipt: Receipt,
    /// Rendered receipt text.
    pub text: String,
    /// Whether the store wants receipts printed automatically.
    pub print: bool,
}

/// One row of the order history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub receipt_number: String,
    pub total_cents: i64,
    pub is_refund: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        OrderSummary {
            id: order.id,
            receipt_number: order.receipt_number,
            total_cents: order.total_cents,
            is_refund: order.is_refund,
            created_at: order.created_at,
        }
    }
}

/// Checks out the active cart.
///
/// ## Errors
/// - `EmptyCart` / `InsufficientStock`: nothing was sent to the database
/// - `CommitFailed`: the transaction rolled back, the cart is untouched
/// - `CheckoutInProgress`: another checkout on this register is committing
pub async fn checkout(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
) -> ApiResult<CheckoutResponse> {
    debug!("checkout command");

    let (order, cashier) = {
        let mut session = session.lock().await;
        let order = session.checkout(&db.inner().orders()).await?;
        let cashier = session
            .user()
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        (order, cashier)
    };

    let settings = store_settings(db).await;
    let receipt = Receipt::project(&order, &settings, &cashier);
    let text = receipt.render(config);

    info!(
        receipt = %order.receipt_number,
        total = %order.total(),
        refund = order.is_refund,
        auto_print = settings.auto_print,
        "Checkout complete"
    );

    Ok(CheckoutResponse {
        receipt,
        text,
        print: settings.auto_print,
    })
}

/// Rebuilds the receipt of a past order.
pub async fn reprint_receipt(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
    receipt_number: &str,
) -> ApiResult<CheckoutResponse> {
    debug!(receipt = %receipt_number, "reprint_receipt command");
    session.lock().await.require_user()?;

    let order = db
        .inner()
        .orders()
        .get_by_receipt(receipt_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Receipt", receipt_number))?;

    let cashier = match db.inner().users().get_by_id(&order.user_id).await? {
        Some(user) => user.full_name,
        None => "(removed user)".to_string(),
    };

    let settings = store_settings(db).await;
    let receipt = Receipt::project(&order, &settings, &cashier);
    let text = receipt.render(config);

    Ok(CheckoutResponse {
        receipt,
        text,
        print: true,
    })
}

pub async fn recent_orders(
    db: &DbState,
    session: &SessionState,
    limit: Option<u32>,
) -> ApiResult<Vec<OrderSummary>> {
    debug!("recent_orders command");
    session.lock().await.require_user()?;

    let orders = db
        .inner()
        .orders()
        .list_recent(limit.unwrap_or(20).clamp(1, 200))
        .await?;
    Ok(orders.into_iter().map(OrderSummary::from).collect())
}

/// The order is already committed by the time this runs, so a settings
/// failure degrades to defaults instead of failing the checkout.
async fn store_settings(db: &DbState) -> Settings {
    match db.inner().settings().get().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Could not read settings, using defaults for receipt");
            Settings::default()
        }
    }
}
