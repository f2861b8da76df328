//! # Settings Commands
//!
//! Register configuration (read-only, from the environment) and the
//! store-wide settings row admins can edit.

use apotheca_core::{Role, Settings};
use tracing::debug;

use crate::error::ApiResult;
use crate::state::{ConfigState, DbState, SessionState};

/// Gets the register configuration.
///
/// ## When Used
/// - Startup banner
/// - Receipt rendering (width, currency)
pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}

/// Gets the store settings (name, receipt header, auto print, threshold).
pub async fn get_settings(db: &DbState) -> ApiResult<Settings> {
    debug!("get_settings command");
    Ok(db.inner().settings().get().await?)
}

/// Replaces the store settings. Admin only.
pub async fn update_settings(
    db: &DbState,
    session: &SessionState,
    settings: Settings,
) -> ApiResult<Settings> {
    session.lock().await.require_role(Role::Admin, "Changing settings")?;
    debug!("update_settings command");

    Ok(db.inner().settings().update(settings).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use apotheca_core::UserSession;
    use chrono::Utc;

    async fn session(role: Role) -> SessionState {
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
    async fn test_admin_updates_settings() {
        let db = DbState::in_memory().await.unwrap();
        let admin = session(Role::Admin).await;

        let mut settings = get_settings(&db).await.unwrap();
        settings.store_name = "  Shifa Medical Store ".to_string();
        settings.low_stock_threshold = 5;

        let saved = update_settings(&db, &admin, settings).await.unwrap();
        assert_eq!(saved.store_name, "Shifa Medical Store");
        assert_eq!(get_settings(&db).await.unwrap().low_stock_threshold, 5);
    }

    #[tokio::test]
    async fn test_cashier_cannot_update() {
        let db = DbState::in_memory().await.unwrap();
        let cashier = session(Role::Cashier).await;

        let settings = get_settings(&db).await.unwrap();
        let err = update_settings(&db, &cashier, settings).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_get_config() {
        let config = ConfigState::default();
        assert_eq!(get_config(&config), config);
    }
}
