//! # Auth Commands
//!
//! Starting and ending an operator's shift at the register.
//!
//! Logging in while someone else is logged in signs the previous operator
//! out first, discarding their open carts.

use apotheca_core::UserSession;
use apotheca_db::Authenticator;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

/// Verifies credentials and starts a shift.
pub async fn login(
    db: &DbState,
    session: &SessionState,
    username: &str,
    password: &str,
) -> ApiResult<UserSession> {
    debug!(username = %username, "login command");

    let authenticator = Authenticator::new(db.inner().users());
    let user = authenticator.login(username, password).await?;

    if let Some(previous) = session.lock().await.sign_in(user.clone()) {
        authenticator.logout(previous);
    }
    Ok(user)
}

/// Ends the current shift and drops any open carts.
pub async fn logout(db: &DbState, session: &SessionState) -> ApiResult<()> {
    debug!("logout command");

    let user = session
        .lock()
        .await
        .sign_out()
        .ok_or_else(ApiError::not_logged_in)?;
    Authenticator::new(db.inner().users()).logout(user);
    Ok(())
}

/// The operator at the register, if any.
pub async fn whoami(session: &SessionState) -> Option<UserSession> {
    session.lock().await.user().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, get_session};
    use crate::error::ErrorCode;
    use apotheca_core::{Category, ProductDraft, Role};

    async fn setup() -> DbState {
        let db = DbState::in_memory().await.unwrap();
        let users = db.inner().users();
        users
            .create("admin", "Administrator", "admin123", Role::Admin)
            .await
            .unwrap();
        users
            .create("ayesha", "Ayesha Khan", "secret1", Role::Cashier)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_login_and_whoami() {
        let db = setup().await;
        let session = SessionState::new();
        assert!(whoami(&session).await.is_none());

        let user = login(&db, &session, "Ayesha", "secret1").await.unwrap();
        assert_eq!(user.role, Role::Cashier);
        assert_eq!(whoami(&session).await.unwrap().username, "ayesha");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let db = setup().await;
        let session = SessionState::new();

        let err = login(&db, &session, "ayesha", "nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
        assert!(whoami(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_logout_discards_carts() {
        let db = setup().await;
        let session = SessionState::new();
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

        login(&db, &session, "ayesha", "secret1").await.unwrap();
        add_to_cart(&db, &session, &product.id).await.unwrap();

        logout(&db, &session).await.unwrap();
        assert!(whoami(&session).await.is_none());
        assert!(get_session(&session).await.carts[0].item_count == 0);

        let err = logout(&db, &session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotLoggedIn);
    }

    #[tokio::test]
    async fn test_login_replaces_operator() {
        let db = setup().await;
        let session = SessionState::new();

        login(&db, &session, "ayesha", "secret1").await.unwrap();
        login(&db, &session, "admin", "admin123").await.unwrap();

        assert_eq!(whoami(&session).await.unwrap().role, Role::Admin);
    }
}
