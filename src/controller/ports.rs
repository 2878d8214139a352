//! Injected side-effect ports: navigation and user-facing notices
//!
//! The controller never talks to a UI framework directly. The embedding
//! application supplies these two capabilities; tests supply recorders.

use log::{debug, info};

/// Route targets the controller can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The login page
    Login,
    /// The authenticated landing page
    Dashboard,
}

/// User-facing notices emitted on lifecycle transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Login completed
    LoggedIn { name: String },
    /// The user logged out
    LoggedOut,
    /// The session ended without the user asking for it (idle timeout or a
    /// dead refresh token)
    SessionExpired,
    /// The backend rate-limited the login attempt
    RateLimited,
    /// Login rejected; carries the message to show
    LoginFailed(String),
    /// Registration rejected; carries the message to show
    RegisterFailed(String),
    /// Registration succeeded but the account needs email verification
    VerificationPending,
    /// Password-reset email requested successfully
    PasswordResetSent,
    /// Password-reset request failed; carries the message to show
    PasswordResetFailed(String),
}

/// Navigation capability supplied by the embedding application
pub trait Navigator: Send + Sync {
    /// Move the UI to the given route
    fn navigate_to(&self, route: Route);
}

/// Notification capability supplied by the embedding application
pub trait Notifier: Send + Sync {
    /// Surface a notice to the user
    fn notify(&self, notice: Notice);
}

/// Logs navigation instead of performing it; useful for headless embedders
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate_to(&self, route: Route) {
        debug!("navigate to {:?}", route);
    }
}

/// Logs notices instead of rendering them
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        info!("notice: {:?}", notice);
    }
}
