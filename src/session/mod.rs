//! Client-side authentication session.
//!
//! [`Session`] is the sole mutable entity of the crate: either the guest
//! sentinel or an authenticated identity with its bearer token. Fields
//! are private so `is_guest == id.is_none() == access_token.is_none()`
//! holds by construction.

mod error;
mod manager;

pub use error::{SessionError, ValidationError};
pub use manager::{SessionManager, FORGOT_PASSWORD_MESSAGE, MIN_PASSWORD_LENGTH};

use regex::Regex;

/// Display name of the guest sentinel.
pub const GUEST_NAME: &str = "Guest";

/// The client's current authentication identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
    name: String,
    is_guest: bool,
    access_token: Option<String>,
}

impl Session {
    /// The canonical "not authenticated" value.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            id: None,
            name: GUEST_NAME.to_string(),
            is_guest: true,
            access_token: None,
        }
    }

    #[must_use]
    pub fn authenticated(
        id: impl Into<String>,
        name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            is_guest: false,
            access_token: Some(access_token.into()),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.is_guest
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::guest()
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}
