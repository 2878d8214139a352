//! Configuration options for the session lifecycle

use std::time::Duration;

/// Tunable durations and margins for the session controller
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Access-token lifetime assumed when the backend omits an expiry
    pub default_access_ttl: Duration,

    /// Refresh-token lifetime assumed when the backend omits an expiry
    pub default_refresh_ttl: Duration,

    /// Fraction of the remaining access-token lifetime to wait before a
    /// silent refresh (0.9 leaves a 10% safety margin)
    pub refresh_margin: f64,

    /// How long a session may sit without observed user activity before it
    /// is forcibly ended
    pub inactivity_timeout: Duration,

    /// How often the inactivity check runs while authenticated
    pub inactivity_check_interval: Duration,

    /// Minimum spacing between activity stamps written to the store, no
    /// matter how many UI events fire
    pub activity_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_access_ttl: Duration::from_secs(24 * 60 * 60),
            default_refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            refresh_margin: 0.9,
            inactivity_timeout: Duration::from_secs(30 * 60),
            inactivity_check_interval: Duration::from_secs(60),
            activity_debounce: Duration::from_secs(1),
        }
    }
}

impl SessionOptions {
    /// Set the default access-token lifetime
    pub fn with_default_access_ttl(mut self, value: Duration) -> Self {
        self.default_access_ttl = value;
        self
    }

    /// Set the default refresh-token lifetime
    pub fn with_default_refresh_ttl(mut self, value: Duration) -> Self {
        self.default_refresh_ttl = value;
        self
    }

    /// Set the refresh safety margin
    pub fn with_refresh_margin(mut self, value: f64) -> Self {
        self.refresh_margin = value;
        self
    }

    /// Set the inactivity timeout
    pub fn with_inactivity_timeout(mut self, value: Duration) -> Self {
        self.inactivity_timeout = value;
        self
    }

    /// Set the inactivity check interval
    pub fn with_inactivity_check_interval(mut self, value: Duration) -> Self {
        self.inactivity_check_interval = value;
        self
    }

    /// Set the activity debounce window
    pub fn with_activity_debounce(mut self, value: Duration) -> Self {
        self.activity_debounce = value;
        self
    }
}
