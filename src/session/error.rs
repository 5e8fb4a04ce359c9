use crate::gateway::GatewayError;
use crate::store::StoreError;
use thiserror::Error;

/// Locally detected bad input; never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Typed failure of a session operation. The kind is preserved so the
/// presentation layer can choose messaging: a connectivity failure must
/// never read as "wrong password".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid email or password")]
    AuthRejected,
    #[error("account is not activated, check your email")]
    AccountNotActivated,
    #[error("too many attempts, wait before retrying")]
    RateLimited,
    #[error("email is already registered")]
    EmailTaken,
    #[error("link is invalid or expired")]
    InvalidToken,
    #[error("rejected by the server: {0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidCredentials => Self::AuthRejected,
            GatewayError::NotActivated => Self::AccountNotActivated,
            GatewayError::RateLimited => Self::RateLimited,
            GatewayError::EmailTaken => Self::EmailTaken,
            GatewayError::InvalidToken => Self::InvalidToken,
            // forgot_password intercepts this before conversion
            GatewayError::EmailNotFound => Self::Rejected("email not found".to_string()),
            GatewayError::Rejected(message) => Self::Rejected(message),
            GatewayError::Transport(message) => Self::Transport(message),
        }
    }
}
