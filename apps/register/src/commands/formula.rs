//! # Formula Commands
//!
//! Generic formulas group brand products into substitutes. Reading is open
//! to every operator; edits are admin only.

use apotheca_core::{Formula, Role};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

pub async fn list_formulas(db: &DbState) -> ApiResult<Vec<Formula>> {
    debug!("list_formulas command");
    Ok(db.inner().formulas().list().await?)
}

pub async fn get_formula(db: &DbState, id: &str) -> ApiResult<Formula> {
    db.inner()
        .formulas()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Formula", id))
}

pub async fn create_formula(
    db: &DbState,
    session: &SessionState,
    name: &str,
    description: Option<&str>,
) -> ApiResult<Formula> {
    session.lock().await.require_role(Role::Admin, "Adding formulas")?;
    debug!(name = %name, "create_formula command");

    Ok(db.inner().formulas().create(name, description).await?)
}

pub async fn update_formula(
    db: &DbState,
    session: &SessionState,
    id: &str,
    name: &str,
    description: Option<&str>,
) -> ApiResult<Formula> {
    session.lock().await.require_role(Role::Admin, "Editing formulas")?;
    debug!(id = %id, name = %name, "update_formula command");

    Ok(db.inner().formulas().rename(id, name, description).await?)
}

/// Deletes a formula. Its products stay in the catalog without one.
pub async fn delete_formula(db: &DbState, session: &SessionState, id: &str) -> ApiResult<()> {
    session.lock().await.require_role(Role::Admin, "Deleting formulas")?;
    debug!(id = %id, "delete_formula command");

    db.inner().formulas().delete(id).await?;
    Ok(())
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
    async fn test_formula_lifecycle() {
        let db = DbState::in_memory().await.unwrap();
        let admin = session(Role::Admin).await;

        let formula = create_formula(&db, &admin, "Paracetamol", Some("Analgesic"))
            .await
            .unwrap();
        let renamed = update_formula(&db, &admin, &formula.id, "Acetaminophen", None)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Acetaminophen");
        assert_eq!(renamed.description, None);

        assert_eq!(list_formulas(&db).await.unwrap().len(), 1);

        delete_formula(&db, &admin, &formula.id).await.unwrap();
        let err = get_formula(&db, &formula.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_and_forbidden() {
        let db = DbState::in_memory().await.unwrap();
        let admin = session(Role::Admin).await;
        create_formula(&db, &admin, "Ibuprofen", None).await.unwrap();

        let err = create_formula(&db, &admin, "ibuprofen", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);

        let cashier = session(Role::Cashier).await;
        let err = create_formula(&db, &cashier, "Cetirizine", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
