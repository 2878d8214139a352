//! Error handling for the dashboard auth client

use std::fmt;
use thiserror::Error;

/// Unified error type for the auth session client
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network or HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Filesystem errors from the persistence backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected the request; carries the HTTP status so callers
    /// can distinguish conditions like rate limiting
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Too many login attempts (HTTP 429)
    #[error("Too many attempts, please try again later")]
    RateLimited,

    /// Login or registration rejected by the backend
    #[error("{0}")]
    InvalidCredentials(String),

    /// The transport call succeeded but the payload lacks required fields
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The refresh token is missing, expired, or was rejected
    #[error("Session expired")]
    SessionExpired,

    /// Session persistence errors
    #[error("Storage error: {0}")]
    Persist(String),
}

impl AuthError {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, message: T) -> Self {
        AuthError::Api {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new invalid-credentials error
    pub fn invalid_credentials<T: fmt::Display>(msg: T) -> Self {
        AuthError::InvalidCredentials(msg.to_string())
    }

    /// Create a new malformed-response error
    pub fn malformed<T: fmt::Display>(msg: T) -> Self {
        AuthError::MalformedResponse(msg.to_string())
    }

    /// Create a new persistence error
    pub fn persist<T: fmt::Display>(msg: T) -> Self {
        AuthError::Persist(msg.to_string())
    }
}
