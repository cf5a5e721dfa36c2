//! Session manager: the sole authority on whether a user is logged in.
//!
//! State is resolved once at construction from the token store (no network
//! call), then driven by `login`/`register`/`logout` and by the
//! `LogoutRequested` signal raised when a request finds the token expired.
//!
//! Transitions are deliberately not serialized against each other: a login
//! racing a logout resolves last-writer-wins on the state slot, same as the
//! shipped client, where user interaction serializes these calls anyway.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::bus::{AuthSignal, SignalBus};
use crate::models::{ProfileUpdate, UserProfile};

use super::jwt;
use super::token::{StoredToken, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated,
}

#[derive(Default)]
struct Slots {
    state: SessionState,
    /// Last failed operation's user-facing message; overwritten by every
    /// failure, cleared by successes and by `clear_error`.
    error: Option<String>,
    /// One-shot notification slot (e.g. registration confirmation).
    message: Option<String>,
}

pub struct SessionManager {
    api: ApiClient,
    store: Arc<TokenStore>,
    bus: SignalBus,
    slots: Mutex<Slots>,
}

impl SessionManager {
    /// Create the manager and resolve the initial state from storage.
    ///
    /// A persisted, unexpired token restores `Authenticated` without any
    /// network call; an expired one runs the full logout procedure so that
    /// storage and dependents are cleaned up.
    pub fn new(api: ApiClient, store: Arc<TokenStore>, bus: SignalBus) -> Self {
        let manager = Self {
            api,
            store,
            bus,
            slots: Mutex::new(Slots::default()),
        };
        manager.resolve_initial_state();
        manager
    }

    fn resolve_initial_state(&self) {
        match self.store.read() {
            Some(token) if !jwt::is_expired(&token.access_token) => {
                debug!("Restored session from stored token");
                self.slots.lock().unwrap().state = SessionState::Authenticated;
            }
            Some(_) => {
                info!("Stored token expired, discarding session");
                self.force_logout();
            }
            None => {}
        }
    }

    pub fn state(&self) -> SessionState {
        self.slots.lock().unwrap().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn error(&self) -> Option<String> {
        self.slots.lock().unwrap().error.clone()
    }

    /// Dismiss the current error banner.
    pub fn clear_error(&self) {
        self.slots.lock().unwrap().error = None;
    }

    pub fn message(&self) -> Option<String> {
        self.slots.lock().unwrap().message.clone()
    }

    pub fn clear_message(&self) {
        self.slots.lock().unwrap().message = None;
    }

    /// Authenticate against the backend. On success the token pair is
    /// persisted and the session becomes `Authenticated`; on failure the
    /// backend's message lands in the error slot. No automatic retry.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.api.login(email, password).await {
            Ok(pair) => {
                let stored = StoredToken {
                    access_token: pair.access_token,
                    token_type: pair.token_type,
                };
                if let Err(e) = self.store.save(&stored) {
                    warn!(error = %e, "Failed to persist token; session will not survive a restart");
                }
                let mut slots = self.slots.lock().unwrap();
                slots.state = SessionState::Authenticated;
                slots.error = None;
                info!("Login succeeded");
                true
            }
            Err(e) => {
                debug!(error = %e, "Login failed");
                self.slots.lock().unwrap().error = Some(e.user_message());
                false
            }
        }
    }

    /// Create an account. Registration deliberately does NOT authenticate:
    /// the user confirms their credentials through a separate login.
    pub async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> bool {
        match self.api.register(email, password, display_name).await {
            Ok(response) => {
                let mut slots = self.slots.lock().unwrap();
                slots.message = Some(response.message);
                slots.error = None;
                true
            }
            Err(e) => {
                debug!(error = %e, "Registration failed");
                self.slots.lock().unwrap().error = Some(e.user_message());
                false
            }
        }
    }

    /// Log out. The backend call is best-effort; whatever it returns, the
    /// local session is torn down.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            debug!(error = %e, "Backend logout failed, proceeding locally");
        }
        self.force_logout();
    }

    /// The logout procedure: clear storage, drop to `Unauthenticated`, and
    /// broadcast `UserLoggedOut` so session-scoped state resets and shells
    /// navigate home. Idempotent apart from re-broadcasting.
    pub fn force_logout(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        {
            let mut slots = self.slots.lock().unwrap();
            slots.state = SessionState::Unauthenticated;
            slots.error = None;
        }
        self.bus.emit(AuthSignal::UserLoggedOut);
    }

    /// React to `LogoutRequested` signals until the bus closes. Run this on
    /// a background task alongside the tenant selector's listener.
    pub async fn listen(self: Arc<Self>) {
        let mut rx = self.bus.subscribe();
        loop {
            match rx.recv().await {
                Ok(AuthSignal::LogoutRequested) => {
                    info!("Logout requested, tearing down session");
                    self.force_logout();
                }
                Ok(AuthSignal::UserLoggedOut) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    // Profile passthroughs for the account screen.

    pub async fn current_user(&self) -> Result<UserProfile, crate::api::ApiError> {
        self.api.current_user().await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, crate::api::ApiError> {
        self.api.update_profile(update).await
    }

    pub async fn delete_account(&self) -> Result<(), crate::api::ApiError> {
        self.api.delete_account().await
    }
}
