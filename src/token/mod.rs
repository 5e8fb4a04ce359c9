//! Bearer-token claim decoding.
//!
//! The client holds no signing key, so the token signature is never
//! verified here; the server does that on every request. Decoding only
//! reads the self-contained claims to rebuild identity across page loads
//! and to drop expired credentials without a network round trip.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("token expired")]
    Expired,
}

/// Identity claims embedded in the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: String,
    pub name: Option<String>,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    user_id: Value,
    #[serde(default)]
    name: Option<String>,
    exp: i64,
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, DecodeError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| DecodeError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode the identity claims out of a bearer token.
///
/// Expects the usual three dot-separated base64url segments; the claims
/// segment must carry `user_id` (number or string) and `exp` in unix
/// seconds. The clock is passed in so expiry is testable.
///
/// # Errors
///
/// Returns an error if the token does not have three segments, a segment
/// is not valid base64url/json, or `exp` is at or before
/// `now_unix_seconds`.
pub fn decode(token: &str, now_unix_seconds: i64) -> Result<IdentityClaims, DecodeError> {
    let mut parts = token.split('.');
    let _header_b64 = parts.next().ok_or(DecodeError::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(DecodeError::TokenFormat)?;
    let _signature_b64 = parts.next().ok_or(DecodeError::TokenFormat)?;
    if parts.next().is_some() {
        return Err(DecodeError::TokenFormat);
    }

    let claims: RawClaims = b64d_json(claims_b64)?;

    let user_id = match claims.user_id {
        Value::String(id) => id,
        Value::Number(id) => id.to_string(),
        _ => return Err(DecodeError::TokenFormat),
    };

    if claims.exp <= now_unix_seconds {
        return Err(DecodeError::Expired);
    }

    Ok(IdentityClaims {
        user_id,
        name: claims.name,
        exp: claims.exp,
    })
}
