//! # Session State
//!
//! The register's open carts, its checkout engine and the logged-in operator.
//!
//! ## Thread Safety
//! Everything sits behind one `tokio::sync::Mutex`. A checkout holds the lock
//! across the commit await, so two checkouts on the same register never
//! interleave and cart edits wait until the commit settles.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SessionState                                                          │
//! │  └── Mutex<RegisterSession>                                            │
//! │        ├── carts:  MultiCartSession  (carts, active index, discount)   │
//! │        ├── engine: CheckoutEngine    (Idle / Committing / ...)         │
//! │        └── user:   Option<UserSession>                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apotheca_core::{
    CheckoutEngine, MultiCartSession, Order, OrderStore, Role, UserSession,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::{ApiError, ApiResult};

/// State owned by one register.
#[derive(Debug, Default)]
pub struct RegisterSession {
    pub carts: MultiCartSession,
    pub engine: CheckoutEngine,
    user: Option<UserSession>,
}

impl RegisterSession {
    pub fn new() -> Self {
        RegisterSession::default()
    }

    pub fn user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    /// The logged-in operator, or `NotLoggedIn`.
    pub fn require_user(&self) -> ApiResult<&UserSession> {
        self.user.as_ref().ok_or_else(ApiError::not_logged_in)
    }

    /// The logged-in operator if they hold `role`.
    pub fn require_role(&self, role: Role, action: &str) -> ApiResult<&UserSession> {
        let user = self.require_user()?;
        user.require(role, action)?;
        Ok(user)
    }

    /// Starts a shift. Returns the session it replaced, if any.
    pub fn sign_in(&mut self, user: UserSession) -> Option<UserSession> {
        let previous = self.sign_out();
        self.user = Some(user);
        previous
    }

    /// Ends the shift. Open carts are discarded so the next operator starts
    /// clean.
    pub fn sign_out(&mut self) -> Option<UserSession> {
        let user = self.user.take()?;
        if self.carts.carts().iter().any(|cart| !cart.is_empty()) {
            info!(username = %user.username, "Discarding open carts at logout");
        }
        self.carts = MultiCartSession::new();
        self.engine.reset();
        Some(user)
    }

    /// Checks out the active cart as the logged-in operator.
    pub async fn checkout<S: OrderStore>(&mut self, store: &S) -> ApiResult<Order> {
        let RegisterSession {
            carts,
            engine,
            user,
        } = self;
        let user = user.as_ref().ok_or_else(ApiError::not_logged_in)?;

        Ok(engine.checkout(carts, store, user).await?)
    }
}

/// Register session behind an async mutex.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<RegisterSession>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Locks the session for the duration of one command.
    pub async fn lock(&self) -> MutexGuard<'_, RegisterSession> {
        self.inner.lock().await
    }
}
