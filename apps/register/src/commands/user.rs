//! # User Commands
//!
//! Account management. Admin only, except that every operator may change
//! their own password.

use apotheca_core::{Role, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::{DbState, SessionState};

/// Account as shown to admins. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

pub async fn create_user(
    db: &DbState,
    session: &SessionState,
    username: &str,
    full_name: &str,
    password: &str,
    role: Role,
) -> ApiResult<UserDto> {
    session.lock().await.require_role(Role::Admin, "Creating users")?;
    debug!(username = %username, role = %role, "create_user command");

    let user = db
        .inner()
        .users()
        .create(username, full_name, password, role)
        .await?;
    Ok(UserDto::from(user))
}

pub async fn list_users(db: &DbState, session: &SessionState) -> ApiResult<Vec<UserDto>> {
    session.lock().await.require_role(Role::Admin, "Listing users")?;
    debug!("list_users command");

    let users = db.inner().users().list().await?;
    Ok(users.into_iter().map(UserDto::from).collect())
}

/// Deletes an account.
///
/// Refuses to delete the logged-in operator or the last admin.
pub async fn delete_user(db: &DbState, session: &SessionState, id: &str) -> ApiResult<()> {
    let current = session
        .lock()
        .await
        .require_role(Role::Admin, "Deleting users")?
        .clone();
    debug!(id = %id, "delete_user command");

    if current.user_id == id {
        return Err(ApiError::new(
            ErrorCode::InUse,
            "You cannot delete your own account",
        ));
    }

    let users = db.inner().users();
    let target = users
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    if target.role == Role::Admin && users.count_admins().await? <= 1 {
        return Err(ApiError::new(
            ErrorCode::InUse,
            "Cannot delete the last admin account",
        ));
    }

    users.delete(id).await?;
    info!(by = %current.username, username = %target.username, "User removed");
    Ok(())
}

/// Changes a password. `id = None` means the logged-in operator.
pub async fn change_password(
    db: &DbState,
    session: &SessionState,
    id: Option<&str>,
    new_password: &str,
) -> ApiResult<()> {
    let current = session.lock().await.require_user()?.clone();
    let target = id.unwrap_or(current.user_id.as_str());

    if target != current.user_id {
        current.require(Role::Admin, "Changing another user's password")?;
    }
    debug!(id = %target, "change_password command");

    db.inner().users().change_password(target, new_password).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apotheca_core::UserSession;

    async fn setup() -> (DbState, SessionState, User) {
        let db = DbState::in_memory().await.unwrap();
        let admin = db
            .inner()
            .users()
            .create("admin", "Administrator", "admin123", Role::Admin)
            .await
            .unwrap();

        let session = SessionState::new();
        session
            .lock()
            .await
            .sign_in(UserSession::start(&admin, Utc::now()));
        (db, session, admin)
    }

    #[tokio::test]
    async fn test_admin_manages_users() {
        let (db, session, _) = setup().await;

        let cashier = create_user(&db, &session, "ayesha", "Ayesha Khan", "secret1", Role::Cashier)
            .await
            .unwrap();
        assert_eq!(list_users(&db, &session).await.unwrap().len(), 2);

        delete_user(&db, &session, &cashier.id).await.unwrap();
        assert_eq!(list_users(&db, &session).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let (db, session, admin) = setup().await;

        let err = delete_user(&db, &session, &admin.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InUse);

        let other = db
            .inner()
            .users()
            .create("owner", "Owner", "owner123", Role::Admin)
            .await
            .unwrap();
        session
            .lock()
            .await
            .sign_in(UserSession::start(&other, Utc::now()));

        delete_user(&db, &session, &admin.id).await.unwrap();
        assert_eq!(db.inner().users().count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_admin_protected() {
        let (db, session, admin) = setup().await;
        let other = db
            .inner()
            .users()
            .create("owner", "Owner", "owner123", Role::Admin)
            .await
            .unwrap();
        db.inner().users().delete(&admin.id).await.unwrap();

        let err = delete_user(&db, &session, &other.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InUse);
        assert_eq!(err.message, "Cannot delete the last admin account");
    }

    #[tokio::test]
    async fn test_password_changes() {
        let (db, session, admin) = setup().await;
        let cashier = db
            .inner()
            .users()
            .create("ayesha", "Ayesha", "secret1", Role::Cashier)
            .await
            .unwrap();

        change_password(&db, &session, Some(&cashier.id), "newpass1")
            .await
            .unwrap();

        session
            .lock()
            .await
            .sign_in(UserSession::start(&cashier, Utc::now()));
        change_password(&db, &session, None, "mine123").await.unwrap();

        let err = change_password(&db, &session, Some(&admin.id), "hijack1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
