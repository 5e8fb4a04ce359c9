//! # vetrina-session
//!
//! The authentication core of the Vetrina storefront client: one place that
//! derives, persists, and exposes "who is logged in" across page loads and
//! across the login/logout/password-recovery lifecycle.
//!
//! The [`session::SessionManager`] is the single writer of authentication
//! state. It reconciles in-memory state with the persisted record at
//! startup ([`session::SessionManager::bootstrap`]), and every state
//! transition commits storage and memory together before notifying
//! subscribers. The presentation layer only reads state and invokes
//! operations; it never touches storage directly.
//!
//! Collaborators, leaves first:
//!
//! - [`store`] — durable persistence of the session record (get/set/clear).
//! - [`token`] — offline decoding of the bearer token's identity claims.
//! - [`gateway`] — the remote REST API (login, logout, register, activate,
//!   forgot/reset password), behind a trait so it can be stubbed.

pub mod gateway;
pub mod session;
pub mod store;
pub mod token;

pub use gateway::{AuthGateway, GatewayError, HttpGateway, LoginGrant, NewAccount};
pub use session::{
    Session, SessionError, SessionManager, ValidationError, FORGOT_PASSWORD_MESSAGE,
    GUEST_NAME, MIN_PASSWORD_LENGTH,
};
pub use store::{FileStore, MemoryStore, SessionRecord, SessionStore, StoreError};
pub use token::{DecodeError, IdentityClaims};
