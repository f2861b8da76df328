//! # Authentication Types
//!
//! Roles and the explicit logged-in session.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Authenticator::login(username, password) ──► UserSession              │
//! │                                                  │                      │
//! │                          passed to every command │                      │
//! │                                                  ▼                      │
//! │                           checkout / catalog / settings                 │
//! │                                                  │                      │
//! │  Authenticator::logout(session) ◄────────────────┘ (consumed)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no process-wide "current user". Whoever holds a `UserSession`
//! is the operator; dropping it ends the login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::User;

/// What an operator is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages catalog, users and settings; can also sell.
    Admin,
    /// Sells only.
    Cashier,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }

    /// True when this role satisfies `required`.
    pub const fn grants(&self, required: Role) -> bool {
        matches!((self, required), (Role::Admin, _) | (Role::Cashier, Role::Cashier))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operator currently at the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserSession {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
}

impl UserSession {
    /// Opens a session for an authenticated user.
    pub fn start(user: &User, now: DateTime<Utc>) -> Self {
        UserSession {
            user_id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            started_at: now,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with [`CoreError::Unauthorized`] unless the role grants `required`.
    pub fn require(&self, required: Role, action: &str) -> CoreResult<()> {
        if self.role.grants(required) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                action: action.to_string(),
                required: required.to_string(),
            })
        }
    }
}
