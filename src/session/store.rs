//! Session store: deterministic state transitions and expiry queries
//!
//! The store is the single source of truth for session state. It performs
//! no network calls and schedules nothing; every operation is a plain state
//! transition followed by a write through the persistence port. The
//! controller owns everything time- and network-shaped.

use std::sync::Arc;

use log::warn;

use crate::session::persist::SessionPersist;
use crate::session::types::{epoch_millis, LoginData, SessionState, User};

/// Holds and persists the session record
pub struct SessionStore {
    state: SessionState,
    persist: Arc<dyn SessionPersist>,
}

impl SessionStore {
    /// Create a store, rehydrating any previously persisted session.
    ///
    /// A corrupt or unreadable blob falls back to the empty state; resuming
    /// a session the backend will reject is worse than asking the user to
    /// log in again.
    pub fn new(persist: Arc<dyn SessionPersist>) -> Self {
        let state = match persist.load() {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::default(),
            Err(err) => {
                warn!("failed to rehydrate session, starting empty: {}", err);
                SessionState::default()
            }
        };
        Self { state, persist }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    /// Whether a login completed and no logout has happened since
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    /// Record a completed login: sets every field and stamps activity
    pub fn login(&mut self, data: LoginData) {
        self.state = SessionState {
            user: Some(data.user),
            access_token: Some(data.access_token),
            refresh_token: Some(data.refresh_token),
            access_token_expiry: data.access_token_expiry,
            refresh_token_expiry: data.refresh_token_expiry,
            is_authenticated: true,
            last_activity: Some(epoch_millis()),
        };
        self.flush();
    }

    /// Replace only the token fields after a silent refresh; user,
    /// authentication flag, and activity stamp are untouched
    pub fn set_tokens(
        &mut self,
        access_token: String,
        refresh_token: String,
        access_token_expiry: i64,
        refresh_token_expiry: i64,
    ) {
        self.state.access_token = Some(access_token);
        self.state.refresh_token = Some(refresh_token);
        self.state.access_token_expiry = Some(access_token_expiry);
        self.state.refresh_token_expiry = Some(refresh_token_expiry);
        self.flush();
    }

    /// Clear every field. Idempotent.
    pub fn logout(&mut self) {
        self.state = SessionState::default();
        if let Err(err) = self.persist.clear() {
            warn!("failed to clear persisted session: {}", err);
        }
    }

    /// Stamp the current time as the most recent user interaction
    pub fn update_last_activity(&mut self) {
        self.state.last_activity = Some(epoch_millis());
        self.flush();
    }

    /// True if the access token is expired or has no known expiry
    pub fn is_access_token_expired(&self) -> bool {
        match self.state.access_token_expiry {
            Some(expiry) => epoch_millis() >= expiry,
            None => true,
        }
    }

    /// True if the refresh token is expired or has no known expiry
    pub fn is_refresh_token_expired(&self) -> bool {
        match self.state.refresh_token_expiry {
            Some(expiry) => epoch_millis() >= expiry,
            None => true,
        }
    }

    fn flush(&self) {
        if let Err(err) = self.persist.save(&self.state) {
            warn!("failed to persist session: {}", err);
        }
    }
}
