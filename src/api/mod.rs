//! Client for the dashboard auth backend
//!
//! Thin typed wrapper over the `/api/auth` endpoints. Session decisions
//! (what counts as a valid login, when to force logout) live in the
//! controller; this module only moves requests and responses.

mod types;

use reqwest::Client;

use crate::error::AuthError;
use crate::fetch::Fetch;

pub use types::*;

/// Client for the auth endpoints of the dashboard backend
#[derive(Debug, Clone)]
pub struct AuthApi {
    /// The base URL of the backend
    url: String,

    /// HTTP client used for requests
    client: Client,
}

impl AuthApi {
    /// Create a new auth client for the given backend base URL
    pub fn new(url: &str) -> Self {
        Self::new_with_client(url, Client::new())
    }

    /// Create a new auth client with a caller-supplied HTTP client
    pub fn new_with_client(url: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/auth{}", self.url, path)
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        Fetch::post(&self.client, &self.endpoint("/login"))
            .json(&body)?
            .execute::<LoginResponse>()
            .await
    }

    /// Register a new account
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AuthError> {
        Fetch::post(&self.client, &self.endpoint("/register"))
            .json(request)?
            .execute::<RegisterResponse>()
            .await
    }

    /// Exchange the current refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };

        Fetch::post(&self.client, &self.endpoint("/refresh-token"))
            .json(&body)?
            .execute::<RefreshResponse>()
            .await
    }

    /// Invalidate the session server-side
    pub async fn logout(&self, access_token: Option<&str>) -> Result<(), AuthError> {
        let mut request = Fetch::post(&self.client, &self.endpoint("/logout"));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        request.execute_empty().await
    }

    /// Request a password-reset email
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };

        Fetch::post(&self.client, &self.endpoint("/forgot-password"))
            .json(&body)?
            .execute_empty()
            .await
    }
}
