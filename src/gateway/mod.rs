//! Remote auth gateway: the REST operations the session manager calls.
//!
//! The trait pins down one result shape per operation so the manager
//! never touches the wire format; stubbing it in tests needs no network.

pub mod http;
pub use http::HttpGateway;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account not activated")]
    NotActivated,
    #[error("too many attempts")]
    RateLimited,
    #[error("email already registered")]
    EmailTaken,
    #[error("email not found")]
    EmailNotFound,
    #[error("token invalid or expired")]
    InvalidToken,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Successful login payload: the bearer token plus the identity fields
/// cached alongside it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
    pub access_token: String,
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_guest: bool,
}

// The server emits numeric user ids; the client treats them as opaque.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Sign-up request for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a bearer token and identity fields.
    async fn login(&self, email: &str, password: &SecretString)
        -> Result<LoginGrant, GatewayError>;

    /// Revoke the session on the server side.
    async fn logout(&self, access_token: &str) -> Result<(), GatewayError>;

    /// Create an account; the server sends an activation email.
    async fn register(&self, account: &NewAccount) -> Result<(), GatewayError>;

    /// Redeem an activation token from the activation email.
    async fn activate(&self, token: &str) -> Result<(), GatewayError>;

    /// Request a password-reset email.
    async fn forgot_password(&self, email: &str) -> Result<(), GatewayError>;

    /// Redeem a reset token with a new password.
    async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), GatewayError>;
}
