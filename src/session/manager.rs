//! The session manager: the single choke point for auth state transitions.
//!
//! Every state-mutating operation runs under one lock, writes storage and
//! memory together, and only then notifies subscribers. Accidental
//! concurrent calls (double submits) queue behind the lock; they can
//! never leave storage and memory holding different credentials.

use super::{valid_email, Session, SessionError, ValidationError};
use crate::gateway::{AuthGateway, GatewayError, NewAccount};
use crate::store::{SessionRecord, SessionStore};
use crate::token;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Reply for `forgot_password`, identical whether or not the email is
/// registered, so the endpoint cannot be used to probe for accounts.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If this email is registered, you will receive a password reset link.";

const REGISTERED_MESSAGE: &str =
    "Registration successful, check your email to activate your account.";
const ACTIVATED_MESSAGE: &str = "Account activated successfully";
const PASSWORD_RESET_MESSAGE: &str = "Password has been reset. You can now log in.";

type Clock = fn() -> i64;

fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

struct State {
    session: Session,
    bootstrapped: bool,
}

/// Owns the in-memory authentication state and the persisted record.
///
/// The presentation layer holds one instance (or an `Arc` of it), reads
/// state via [`current`](Self::current) or
/// [`subscribe`](Self::subscribe), and invokes the operations below. It
/// never writes storage directly.
pub struct SessionManager<S: SessionStore> {
    store: S,
    gateway: Arc<dyn AuthGateway>,
    clock: Clock,
    state: Mutex<State>,
    updates: watch::Sender<Session>,
}

impl<S: SessionStore> SessionManager<S> {
    #[must_use]
    pub fn new(store: S, gateway: Arc<dyn AuthGateway>) -> Self {
        Self::with_clock(store, gateway, system_now)
    }

    /// Like [`new`](Self::new) with an injectable clock for expiry checks.
    #[must_use]
    pub fn with_clock(store: S, gateway: Arc<dyn AuthGateway>, clock: Clock) -> Self {
        let (updates, _) = watch::channel(Session::guest());

        Self {
            store,
            gateway,
            clock,
            state: Mutex::new(State {
                session: Session::guest(),
                bootstrapped: false,
            }),
            updates,
        }
    }

    /// Snapshot of the current session.
    pub async fn current(&self) -> Session {
        self.state.lock().await.session.clone()
    }

    /// Change notifications; every committed session is observable here.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.updates.subscribe()
    }

    // Memory and subscribers change together, under the state lock.
    fn commit(&self, state: &mut State, session: Session) {
        state.session = session.clone();
        self.updates.send_replace(session);
    }

    fn clear_storage(&self) {
        if let Err(err) = self.store.clear() {
            error!("Failed to clear session storage: {err}");
        }
    }

    /// Reconstruct the session from persisted storage. Never calls the
    /// network; a second call is a no-op returning the current state.
    ///
    /// A missing record, an unreadable record, or a credential that fails
    /// to decode or has expired all collapse to Guest; the stale record
    /// is cleared and no error surfaces.
    pub async fn bootstrap(&self) -> Session {
        let mut state = self.state.lock().await;
        if state.bootstrapped {
            return state.session.clone();
        }
        state.bootstrapped = true;

        let record = match self.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.commit(&mut state, Session::guest());
                return state.session.clone();
            }
            Err(err) => {
                error!("Failed to load persisted session: {err}");
                self.clear_storage();
                self.commit(&mut state, Session::guest());
                return state.session.clone();
            }
        };

        let session = match token::decode(&record.access_token, (self.clock)()) {
            Ok(claims) => {
                // The token does not always carry a display name; the
                // record caches the one from the login response.
                let name = claims.name.unwrap_or(record.name);
                Session::authenticated(claims.user_id, name, record.access_token)
            }
            Err(err) => {
                debug!("Dropping persisted credential: {err}");
                self.clear_storage();
                Session::guest()
            }
        };

        self.commit(&mut state, session);
        state.session.clone()
    }

    /// Exchange credentials for an authenticated session.
    ///
    /// # Errors
    ///
    /// Empty or malformed input fails with
    /// [`SessionError::Validation`] before any network call. Gateway
    /// failures map to [`SessionError::AuthRejected`],
    /// [`SessionError::AccountNotActivated`],
    /// [`SessionError::RateLimited`], or [`SessionError::Transport`]; on
    /// any failure the session and storage are left untouched.
    pub async fn log_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword.into());
        }
        if !valid_email(email) {
            return Err(ValidationError::InvalidEmail.into());
        }

        let mut state = self.state.lock().await;

        let password = SecretString::from(password.to_string());
        let grant = self.gateway.login(email, &password).await?;

        let record = SessionRecord {
            access_token: grant.access_token,
            id: grant.id,
            name: grant.name,
            is_guest: false,
        };
        self.store.save(&record)?;

        let session = Session::authenticated(record.id, record.name, record.access_token);
        self.commit(&mut state, session);
        Ok(state.session.clone())
    }

    /// Drop the session: best-effort remote revocation, guaranteed local
    /// clear. After this call the session is Guest and storage is empty,
    /// whatever the gateway said. Idempotent when already Guest.
    pub async fn log_out(&self) -> Session {
        let mut state = self.state.lock().await;

        if let Some(access_token) = state.session.access_token() {
            if let Err(err) = self.gateway.logout(access_token).await {
                error!("Remote logout failed: {err}");
            }
        }

        self.clear_storage();
        self.commit(&mut state, Session::guest());
        state.session.clone()
    }

    /// Create a new account. Does not mutate the session; the account
    /// must be activated and logged into afterwards.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::Validation`] before any network call on
    /// empty fields, a malformed email, a short password, or mismatched
    /// confirmation; with [`SessionError::EmailTaken`] when the gateway
    /// reports the address as registered.
    pub async fn register(&self, account: &NewAccount) -> Result<String, SessionError> {
        if account.email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        if !valid_email(&account.email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        if account.first_name.is_empty() {
            return Err(ValidationError::EmptyField("first name").into());
        }
        if account.last_name.is_empty() {
            return Err(ValidationError::EmptyField("last name").into());
        }
        let password = account.password.expose_secret();
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword.into());
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort.into());
        }
        if password != account.password_confirmation.expose_secret() {
            return Err(ValidationError::PasswordMismatch.into());
        }

        self.gateway.register(account).await?;

        Ok(REGISTERED_MESSAGE.to_string())
    }

    /// Redeem an activation token. Does not mutate the session; the
    /// browser stays Guest until a subsequent login.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::InvalidToken`] when the gateway rejects
    /// the token, or [`SessionError::Transport`] on connectivity failure.
    pub async fn activate_account(&self, activation_token: &str) -> Result<String, SessionError> {
        if activation_token.is_empty() {
            return Err(ValidationError::EmptyField("activation token").into());
        }

        self.gateway.activate(activation_token).await?;

        Ok(ACTIVATED_MESSAGE.to_string())
    }

    /// Request a password-reset email. Does not mutate the session.
    ///
    /// Returns [`FORGOT_PASSWORD_MESSAGE`] for both a delivered email and
    /// an unknown address.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::Validation`] on empty or malformed
    /// email, or a typed gateway error other than "not found".
    pub async fn forgot_password(&self, email: &str) -> Result<String, SessionError> {
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        if !valid_email(email) {
            return Err(ValidationError::InvalidEmail.into());
        }

        match self.gateway.forgot_password(email).await {
            Ok(()) | Err(GatewayError::EmailNotFound) => Ok(FORGOT_PASSWORD_MESSAGE.to_string()),
            Err(err) => Err(err.into()),
        }
    }

    /// Redeem a reset token with a new password. Does not mutate the
    /// session.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::Validation`] before any network call
    /// when the passwords differ or the new password is shorter than
    /// [`MIN_PASSWORD_LENGTH`]; with [`SessionError::InvalidToken`] when
    /// the gateway rejects the token.
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<String, SessionError> {
        if reset_token.is_empty() {
            return Err(ValidationError::EmptyField("reset token").into());
        }
        if new_password != confirmation {
            return Err(ValidationError::PasswordMismatch.into());
        }
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort.into());
        }

        let password = SecretString::from(new_password.to_string());
        let confirmation = SecretString::from(confirmation.to_string());
        self.gateway
            .reset_password(reset_token, &password, &confirmation)
            .await?;

        Ok(PASSWORD_RESET_MESSAGE.to_string())
    }
}
