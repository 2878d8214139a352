//! Wire types for the auth backend endpoints
//!
//! Response fields are optional wherever the backend has been observed to
//! omit them; the controller decides whether a partially-populated payload
//! is acceptable.

use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The signed-in user, possibly partial
    #[serde(default)]
    pub user: Option<UserPayload>,

    /// The access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// The refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access-token expiry, epoch milliseconds
    #[serde(default)]
    pub access_token_expiry: Option<i64>,

    /// Refresh-token expiry, epoch milliseconds
    #[serde(default)]
    pub refresh_token_expiry: Option<i64>,
}

/// User record as the backend sends it; every field may be missing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Registration response; tokens are present only when the backend
/// authenticates the new account immediately
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub access_token_expiry: Option<i64>,

    #[serde(default)]
    pub refresh_token_expiry: Option<i64>,
}

/// Token refresh request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token refresh response; all four fields are required by the backend
/// contract
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

/// Forgot-password request body
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}
