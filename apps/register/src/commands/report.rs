//! # Report Commands
//!
//! Sales analytics for admins over an inclusive range of UTC days.

use apotheca_core::{DailyTotal, Role, SalesSummary, TopProduct};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

const DEFAULT_TOP_PRODUCTS: u32 = 10;

/// Everything the sales report screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: SalesSummary,
    pub top_products: Vec<TopProduct>,
    pub daily: Vec<DailyTotal>,
}

/// Sales report for admins.
pub async fn sales_report(
    db: &DbState,
    session: &SessionState,
    from: NaiveDate,
    to: NaiveDate,
    top: Option<u32>,
) -> ApiResult<SalesReport> {
    session.lock().await.require_role(Role::Admin, "Viewing reports")?;
    debug!(%from, %to, "sales_report command");

    build_report(db, from, to, top).await
}

/// Builds the report without a session check. Used by the one-shot
/// `apotheca report` command, which runs with direct database access.
pub async fn build_report(
    db: &DbState,
    from: NaiveDate,
    to: NaiveDate,
    top: Option<u32>,
) -> ApiResult<SalesReport> {
    if from > to {
        return Err(ApiError::validation(format!(
            "Report range starts after it ends: {} > {}",
            from, to
        )));
    }

    let reports = db.inner().reports();
    let top = top.unwrap_or(DEFAULT_TOP_PRODUCTS).clamp(1, 100);

    Ok(SalesReport {
        from,
        to,
        summary: reports.sales_summary(from, to).await?,
        top_products: reports.top_products(from, to, top).await?,
        daily: reports.daily_totals(from, to).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, set_quantity};
    use crate::commands::checkout::checkout;
    use crate::error::ErrorCode;
    use crate::state::ConfigState;
    use apotheca_core::{Category, ProductDraft, UserSession};
    use chrono::Utc;

    async fn session(role: Role) -> SessionState {
        let state = SessionState::new();
        state.lock().await.sign_in(UserSession {
            user_id: "u-1".to_string(),
            username: "owner".to_string(),
            full_name: "Owner".to_string(),
            role,
            started_at: Utc::now(),
        });
        state
    }

    #[tokio::test]
    async fn test_report_after_sale() {
        let db = DbState::in_memory().await.unwrap();
        let admin = session(Role::Admin).await;
        let product = db
            .inner()
            .products()
            .insert(ProductDraft {
                name: "Panadol".to_string(),
                category: Category::Tablet,
                quantity: 10,
                sale_price_cents: 500,
                ..Default::default()
            })
            .await
            .unwrap();

        add_to_cart(&db, &admin, &product.id).await.unwrap();
        set_quantity(&admin, &product.id, 2).await.unwrap();
        checkout(&db, &admin, &ConfigState::default()).await.unwrap();

        let today = Utc::now().date_naive();
        let report = sales_report(&db, &admin, today, today, None).await.unwrap();

        assert_eq!(report.summary.order_count, 1);
        assert_eq!(report.summary.net_cents, 1000);
        assert_eq!(report.top_products.len(), 1);
        assert_eq!(report.top_products[0].quantity, 2);
        assert_eq!(report.daily.len(), 1);
    }

    #[tokio::test]
    async fn test_report_guards() {
        let db = DbState::in_memory().await.unwrap();
        let today = Utc::now().date_naive();

        let cashier = session(Role::Cashier).await;
        let err = sales_report(&db, &cashier, today, today, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let admin = session(Role::Admin).await;
        let yesterday = today.pred_opt().unwrap();
        let err = sales_report(&db, &admin, today, yesterday, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
