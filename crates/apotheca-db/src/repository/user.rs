//! # User Repository
//!
//! Operator accounts and login.
//!
//! Passwords are stored as PHC-format argon2 hashes. The register never holds
//! a "current user" global: [`Authenticator::login`] hands back an explicit
//! [`UserSession`] and [`Authenticator::logout`] consumes it.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use apotheca_core::validation::{validate_password, validate_product_name, validate_username};
use apotheca_core::{Role, User, UserSession};

const USER_COLUMNS: &str = "id, username, full_name, role, password_hash, created_at";

/// Repository for operator accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - Bad username or password
    /// * `Err(DbError::UniqueViolation)` - Username taken (case-insensitive)
    pub async fn create(
        &self,
        username: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> DbResult<User> {
        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;

        let full_name = match full_name.trim() {
            "" => username,
            name => name,
        };
        validate_product_name(full_name)?;

        debug!(username = %username, role = %role, "Creating user");

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, full_name, role, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
            other => other,
        })?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// All accounts, ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username COLLATE NOCASE");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Case-insensitive lookup.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn change_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        validate_password(new_password)?;
        let hash = hash_password(new_password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Deletes an account. Orders it committed keep its id.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_admins(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Creates the first admin account when the table is empty.
    ///
    /// Returns the new account, or `None` when users already exist.
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> DbResult<Option<User>> {
        if self.count().await? > 0 {
            return Ok(None);
        }

        warn!(username = %username, "No users found, creating bootstrap admin");
        let admin = self
            .create(username, "Administrator", password, Role::Admin)
            .await?;
        Ok(Some(admin))
    }
}

// =============================================================================
// Authenticator
// =============================================================================

/// Checks credentials and issues [`UserSession`]s.
#[derive(Debug, Clone)]
pub struct Authenticator {
    users: UserRepository,
}

impl Authenticator {
    pub fn new(users: UserRepository) -> Self {
        Authenticator { users }
    }

    /// Verifies the credentials and starts a session.
    ///
    /// Unknown usernames and wrong passwords give the same error.
    pub async fn login(&self, username: &str, password: &str) -> DbResult<UserSession> {
        let Some(user) = self.users.get_by_username(username).await? else {
            warn!(username = %username.trim(), "Login failed: unknown user");
            return Err(DbError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            warn!(username = %user.username, "Login failed: wrong password");
            return Err(DbError::InvalidCredentials);
        }

        let session = UserSession::start(&user, Utc::now());
        info!(user_id = %user.id, username = %user.username, role = %user.role, "Logged in");
        Ok(session)
    }

    /// Ends a session. The session value is consumed.
    pub fn logout(&self, session: UserSession) {
        info!(
            user_id = %session.user_id,
            username = %session.username,
            "Logged out"
        );
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
