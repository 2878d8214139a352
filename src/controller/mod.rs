//! Session controller: bridges the pure store to time and the network
//!
//! The controller is the only component that schedules timers, calls the
//! auth backend, or triggers navigation. The store stays deterministic;
//! everything clock- or network-shaped funnels through here.
//!
//! Per authenticated session the controller owns exactly two background
//! tasks: a one-shot refresh timer and a recurring inactivity check. Both
//! are torn down together on every transition out of the active state, so
//! no orphaned callback can fire against a cleared session.

mod activity;
mod ports;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::api::{AuthApi, LoginResponse, RegisterRequest, UserPayload};
use crate::config::SessionOptions;
use crate::error::AuthError;
use crate::session::{epoch_millis, LoginData, SessionState, SessionStore, User};

use activity::ActivityGate;

pub use activity::{ActivityKind, ActivityTracker};
pub use ports::{LogNavigator, LogNotifier, Navigator, Notice, Notifier, Route};

struct ControllerInner {
    api: AuthApi,
    store: Arc<Mutex<SessionStore>>,
    options: SessionOptions,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    inactivity_task: Mutex<Option<JoinHandle<()>>>,
    activity_gate: Arc<ActivityGate>,
    is_logging_in: AtomicBool,
    is_registering: AtomicBool,
    is_logging_out: AtomicBool,
    is_forgot_password_pending: AtomicBool,
}

/// Orchestrates the session lifecycle: login/logout/register, silent token
/// refresh, and inactivity timeout.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    /// Create a controller around a store and the injected side-effect
    /// ports
    pub fn new(
        api: AuthApi,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let activity_gate = Arc::new(ActivityGate::new(
            options.activity_debounce.as_millis() as i64
        ));
        Self {
            inner: Arc::new(ControllerInner {
                api,
                store: Arc::new(Mutex::new(store)),
                options,
                navigator,
                notifier,
                refresh_timer: Mutex::new(None),
                inactivity_task: Mutex::new(None),
                activity_gate,
                is_logging_in: AtomicBool::new(false),
                is_registering: AtomicBool::new(false),
                is_logging_out: AtomicBool::new(false),
                is_forgot_password_pending: AtomicBool::new(false),
            }),
        }
    }

    // --- consumer-facing queries ---

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.inner.store.lock().unwrap().user().cloned()
    }

    /// Whether a session is currently active
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.lock().unwrap().is_authenticated()
    }

    /// Snapshot of the full session state
    pub fn session_state(&self) -> SessionState {
        self.inner.store.lock().unwrap().state().clone()
    }

    /// Whether a login call is in flight
    pub fn is_logging_in(&self) -> bool {
        self.inner.is_logging_in.load(Ordering::SeqCst)
    }

    /// Whether a register call is in flight
    pub fn is_registering(&self) -> bool {
        self.inner.is_registering.load(Ordering::SeqCst)
    }

    /// Whether a logout call is in flight
    pub fn is_logging_out(&self) -> bool {
        self.inner.is_logging_out.load(Ordering::SeqCst)
    }

    /// Whether a forgot-password call is in flight
    pub fn is_forgot_password_pending(&self) -> bool {
        self.inner.is_forgot_password_pending.load(Ordering::SeqCst)
    }

    /// Whether a silent refresh is scheduled and has not fired yet
    pub fn has_pending_refresh(&self) -> bool {
        self.inner
            .refresh_timer
            .lock()
            .unwrap()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Handle for the UI event wiring to report user interactions
    pub fn activity_tracker(&self) -> ActivityTracker {
        ActivityTracker::new(
            self.inner.activity_gate.clone(),
            Arc::downgrade(&self.inner.store),
        )
    }

    // --- lifecycle operations ---

    /// Authenticate with email and password.
    ///
    /// A transport-level success whose payload is missing the user, the
    /// user's name, or either token counts as a failure: the store is not
    /// touched and an error is surfaced. Missing expiries are synthesized
    /// from the configured defaults.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.inner.is_logging_in.store(true, Ordering::SeqCst);
        let result = self.login_inner(email, password).await;
        self.inner.is_logging_in.store(false, Ordering::SeqCst);
        result
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = match self.inner.api.login(email, password).await {
            Ok(response) => response,
            Err(err) => {
                let err = map_credential_error(err, "Invalid email or password");
                self.inner.notifier.notify(match &err {
                    AuthError::RateLimited => Notice::RateLimited,
                    other => Notice::LoginFailed(other.to_string()),
                });
                return Err(err);
            }
        };

        let (user, access_token, refresh_token, access_expiry, refresh_expiry) =
            match validate_login_response(response) {
                Ok(fields) => fields,
                Err(err) => {
                    warn!("rejecting malformed login response: {}", err);
                    self.inner
                        .notifier
                        .notify(Notice::LoginFailed(err.to_string()));
                    return Err(err);
                }
            };

        let now = epoch_millis();
        let name = user.name.clone();
        let data = LoginData {
            user,
            access_token,
            refresh_token,
            access_token_expiry: Some(access_expiry.unwrap_or_else(|| {
                now + self.inner.options.default_access_ttl.as_millis() as i64
            })),
            refresh_token_expiry: Some(refresh_expiry.unwrap_or_else(|| {
                now + self.inner.options.default_refresh_ttl.as_millis() as i64
            })),
        };

        self.inner.store.lock().unwrap().login(data);
        info!("login succeeded for {}", name);

        self.start_session_tasks();
        self.schedule_refresh();
        self.inner.notifier.notify(Notice::LoggedIn { name });
        self.inner.navigator.navigate_to(Route::Dashboard);
        Ok(())
    }

    /// Register a new account.
    ///
    /// When the backend returns tokens the new account is logged in
    /// immediately; token expiries are taken exactly as the backend sent
    /// them, absent ones included. Without tokens the session stays
    /// unauthenticated and the user is sent to the login page with a
    /// verification-pending notice.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        self.inner.is_registering.store(true, Ordering::SeqCst);
        let result = self.register_inner(name, email, password, role).await;
        self.inner.is_registering.store(false, Ordering::SeqCst);
        result
    }

    async fn register_inner(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        };

        let response = match self.inner.api.register(&request).await {
            Ok(response) => response,
            Err(err) => {
                let err = map_credential_error(err, "Registration failed");
                self.inner.notifier.notify(match &err {
                    AuthError::RateLimited => Notice::RateLimited,
                    other => Notice::RegisterFailed(other.to_string()),
                });
                return Err(err);
            }
        };

        let (access_token, refresh_token) = match (&response.access_token, &response.refresh_token)
        {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                (access.clone(), refresh.clone())
            }
            _ => {
                // Backend wants email verification before the first login
                info!("registration accepted, verification pending for {}", email);
                self.inner.notifier.notify(Notice::VerificationPending);
                self.inner.navigator.navigate_to(Route::Login);
                return Ok(());
            }
        };

        let user = User {
            id: response.id.unwrap_or_default(),
            name: response.name.unwrap_or_else(|| name.to_string()),
            email: response.email.unwrap_or_else(|| email.to_string()),
            role: response.role.unwrap_or_else(|| role.to_string()),
            permissions: Vec::new(),
        };
        let display_name = user.name.clone();

        // Registration responses keep their expiries verbatim; the login
        // path is the only one that synthesizes defaults
        let data = LoginData {
            user,
            access_token,
            refresh_token,
            access_token_expiry: response.access_token_expiry,
            refresh_token_expiry: response.refresh_token_expiry,
        };

        self.inner.store.lock().unwrap().login(data);
        info!("registration auto-login for {}", display_name);

        self.start_session_tasks();
        self.schedule_refresh();
        self.inner.notifier.notify(Notice::LoggedIn {
            name: display_name,
        });
        self.inner.navigator.navigate_to(Route::Dashboard);
        Ok(())
    }

    /// End the session.
    ///
    /// The backend call is best-effort: the local session is cleared and
    /// the user is sent to the login page whether or not the network call
    /// succeeds.
    pub async fn logout(&self) {
        self.inner.is_logging_out.store(true, Ordering::SeqCst);

        let access_token = self
            .inner
            .store
            .lock()
            .unwrap()
            .state()
            .access_token
            .clone();
        if let Err(err) = self.inner.api.logout(access_token.as_deref()).await {
            warn!("logout endpoint failed, clearing local session anyway: {}", err);
        }

        self.end_session(Notice::LoggedOut);
        self.inner.is_logging_out.store(false, Ordering::SeqCst);
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Guarded: with no refresh token, or one whose recorded expiry has
    /// passed, no network call is made and the session is ended. A rejected
    /// or failed refresh ends the session the same way; retrying a dead
    /// refresh token cannot succeed. A token with no recorded expiry is
    /// sent to the backend, which is the authority on its validity.
    pub async fn refresh_access_token(&self) -> Result<(), AuthError> {
        let refresh_token = {
            let store = self.inner.store.lock().unwrap();
            if expiry_elapsed(store.state().refresh_token_expiry) {
                None
            } else {
                store.state().refresh_token.clone()
            }
        };

        let Some(refresh_token) = refresh_token else {
            warn!("refresh token missing or expired, ending session");
            self.end_session(Notice::SessionExpired);
            return Err(AuthError::SessionExpired);
        };

        match self.inner.api.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.inner.store.lock().unwrap().set_tokens(
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.access_token_expiry,
                    tokens.refresh_token_expiry,
                );
                debug!("access token refreshed");
                self.schedule_refresh();
                Ok(())
            }
            Err(err) => {
                warn!("token refresh failed, ending session: {}", err);
                self.end_session(Notice::SessionExpired);
                Err(err)
            }
        }
    }

    /// Schedule the next silent refresh, replacing any pending one.
    ///
    /// The refresh fires after 90% (configurable) of the remaining
    /// access-token lifetime, immediately if the access token is already
    /// expired or carries no recorded expiry. A refresh token whose
    /// recorded expiry has passed ends the session on the spot, without a
    /// network call.
    ///
    /// Spawns the timer task, so it must be called from within a tokio
    /// runtime.
    pub fn schedule_refresh(&self) {
        self.cancel_refresh_timer();

        let (authenticated, has_refresh, refresh_expiry, access_expiry) = {
            let store = self.inner.store.lock().unwrap();
            (
                store.is_authenticated(),
                store.state().refresh_token.is_some(),
                store.state().refresh_token_expiry,
                store.state().access_token_expiry,
            )
        };

        if !authenticated || !has_refresh {
            return;
        }
        if expiry_elapsed(refresh_expiry) {
            info!("refresh token already expired, ending session");
            self.end_session(Notice::SessionExpired);
            return;
        }

        // An access token with an unrecorded expiry is refreshed right
        // away, which also learns the real lifetimes from the backend
        let delay = match access_expiry {
            Some(at) if at > epoch_millis() => {
                let remaining = at - epoch_millis();
                Duration::from_millis(
                    (remaining as f64 * self.inner.options.refresh_margin) as u64,
                )
            }
            _ => Duration::ZERO,
        };

        debug!("next token refresh in {:?}", delay);
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = controller.refresh_access_token().await;
        });
        *self.inner.refresh_timer.lock().unwrap() = Some(handle);
    }

    /// Restart scheduling for a session rehydrated from persistence.
    ///
    /// Call once at startup, from within a tokio runtime (the background
    /// tasks are spawned onto it). A rehydrated session whose refresh
    /// token has a recorded expiry in the past is ended immediately;
    /// otherwise activity tracking, the inactivity check, and refresh
    /// scheduling all resume.
    pub fn resume(&self) {
        let (authenticated, refresh_expired) = {
            let store = self.inner.store.lock().unwrap();
            (
                store.is_authenticated(),
                expiry_elapsed(store.state().refresh_token_expiry),
            )
        };

        if !authenticated {
            return;
        }
        if refresh_expired {
            info!("rehydrated session has an expired refresh token, ending it");
            self.end_session(Notice::SessionExpired);
            return;
        }

        info!("resuming persisted session");
        self.start_session_tasks();
        self.schedule_refresh();
    }

    /// Request a password-reset email. Never touches session state.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.inner
            .is_forgot_password_pending
            .store(true, Ordering::SeqCst);
        let result = self.inner.api.forgot_password(email).await;
        self.inner
            .is_forgot_password_pending
            .store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.inner.notifier.notify(Notice::PasswordResetSent);
                Ok(())
            }
            Err(err) => {
                warn!("forgot-password request failed: {}", err);
                self.inner
                    .notifier
                    .notify(Notice::PasswordResetFailed(err.to_string()));
                Err(err)
            }
        }
    }

    // --- internals ---

    /// Open the activity gate and start the recurring inactivity check,
    /// replacing any previous instance
    fn start_session_tasks(&self) {
        self.inner.activity_gate.open();

        let controller = self.clone();
        let period = self.inner.options.inactivity_check_interval;
        let timeout_ms = self.inner.options.inactivity_timeout.as_millis() as i64;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick of a tokio interval completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let idle = {
                    let store = controller.inner.store.lock().unwrap();
                    match (store.is_authenticated(), store.state().last_activity) {
                        (true, Some(last)) => epoch_millis() - last > timeout_ms,
                        _ => false,
                    }
                };
                if idle {
                    info!("session idle past timeout, ending it");
                    controller.end_session(Notice::SessionExpired);
                    break;
                }
            }
        });

        if let Some(previous) = self
            .inner
            .inactivity_task
            .lock()
            .unwrap()
            .replace(handle)
        {
            previous.abort();
        }
    }

    fn cancel_refresh_timer(&self) {
        if let Some(handle) = self.inner.refresh_timer.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Tear down timers and listeners, clear the store, and send the user
    /// to the login page. Every path out of the active state funnels
    /// through here.
    fn end_session(&self, notice: Notice) {
        self.cancel_refresh_timer();
        if let Some(handle) = self.inner.inactivity_task.lock().unwrap().take() {
            handle.abort();
        }
        self.inner.activity_gate.close();

        self.inner.store.lock().unwrap().logout();
        self.inner.notifier.notify(notice);
        self.inner.navigator.navigate_to(Route::Login);
    }
}

/// Whether an expiry timestamp is recorded and already in the past.
///
/// An absent expiry is unknown, not elapsed: sessions created without
/// expiries (registration auto-login keeps the backend's payload verbatim)
/// must refresh instead of being torn down. The store's expiry queries
/// keep the stricter absent-means-expired reading for consumers.
fn expiry_elapsed(expiry: Option<i64>) -> bool {
    matches!(expiry, Some(at) if at <= epoch_millis())
}

/// Map transport/API failures on the credential paths: 429 becomes the
/// distinct rate-limit error, anything else surfaces the server's message
/// or the given fallback
fn map_credential_error(err: AuthError, fallback: &str) -> AuthError {
    match err {
        AuthError::Api { status: 429, .. } => AuthError::RateLimited,
        AuthError::Api { message, .. } if !message.trim().is_empty() => {
            AuthError::InvalidCredentials(message)
        }
        AuthError::Api { .. } | AuthError::Http(_) => AuthError::invalid_credentials(fallback),
        other => other,
    }
}

type ValidatedLogin = (User, String, String, Option<i64>, Option<i64>);

/// Check a login response for the fields a session cannot exist without
fn validate_login_response(response: LoginResponse) -> Result<ValidatedLogin, AuthError> {
    let user = response
        .user
        .ok_or_else(|| AuthError::malformed("login response has no user"))?;
    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::malformed("login response has no access token"))?;
    let refresh_token = response
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::malformed("login response has no refresh token"))?;

    let user = build_user(user)?;

    Ok((
        user,
        access_token,
        refresh_token,
        response.access_token_expiry,
        response.refresh_token_expiry,
    ))
}

/// Convert the wire user into the session identity record; a user without
/// a name is not a user
fn build_user(payload: UserPayload) -> Result<User, AuthError> {
    let name = payload
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AuthError::malformed("login response user has no name"))?;

    Ok(User {
        id: payload.id.unwrap_or_default(),
        name,
        email: payload.email.unwrap_or_default(),
        role: payload.role.unwrap_or_default(),
        permissions: payload.permissions.unwrap_or_default(),
    })
}
