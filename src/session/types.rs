//! Session state types

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user ID
    pub id: String,

    /// Display name
    pub name: String,

    /// The user's email address
    pub email: String,

    /// The user's role
    pub role: String,

    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// The full session record, persisted as one JSON blob
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    /// The signed-in user, absent while unauthenticated
    pub user: Option<User>,

    /// The access token
    pub access_token: Option<String>,

    /// The refresh token
    pub refresh_token: Option<String>,

    /// Access-token expiry, epoch milliseconds
    pub access_token_expiry: Option<i64>,

    /// Refresh-token expiry, epoch milliseconds
    pub refresh_token_expiry: Option<i64>,

    /// True iff a login completed and no logout has happened since
    pub is_authenticated: bool,

    /// Epoch milliseconds of the most recent observed user interaction
    pub last_activity: Option<i64>,
}

/// Payload for a completed login
#[derive(Debug, Clone)]
pub struct LoginData {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as supplied by the backend; the controller fills in defaults
    /// on the login path and passes registration responses through as-is
    pub access_token_expiry: Option<i64>,
    pub refresh_token_expiry: Option<i64>,
}

/// Current wall-clock time in epoch milliseconds
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as i64
}
