//! Signed session claims.
//!
//! Both the login session and the pending two-factor session are HS256 JWTs
//! carrying the user id. The `kind` claim keeps one from being replayed as
//! the other.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Lifetime of a login session token when "remember me" is set (30 days).
pub const REMEMBERED_SESSION_TTL: u64 = 30 * 24 * 3600;

/// Lifetime of a login session token bound to the browser session (1 day).
pub const BROWSER_SESSION_TTL: u64 = 24 * 3600;

/// Absolute lifetime of a pending two-factor session (5 minutes).
pub const TWO_FACTOR_SESSION_TTL: u64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Fully authenticated session.
    Login,
    /// Password accepted, TOTP still pending.
    TwoFactor,
}

/// JWT claims payload.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | user id |
/// | `kind` | custom | [`SessionKind`] |
/// | `exp` | `exp` | expiry, seconds since epoch |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i32,
    pub kind: SessionKind,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session expired")]
    Expired,
    #[error("invalid session signature")]
    InvalidSignature,
    #[error("malformed session")]
    Malformed,
    #[error("unexpected session kind")]
    WrongKind,
    #[error("failed to sign session")]
    Signing,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Sign a session token for `user_id` that expires `ttl_secs` from now.
pub fn issue(
    user_id: i32,
    kind: SessionKind,
    ttl_secs: u64,
    secret: &str,
) -> Result<(String, SessionClaims), SessionError> {
    let claims = SessionClaims {
        sub: user_id,
        kind,
        exp: now_secs() + ttl_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| SessionError::Signing)?;
    Ok((token, claims))
}

/// Decode and validate a session token of the expected kind.
///
/// No leeway: the two-factor deadline is absolute.
pub fn validate(token: &str, expected: SessionKind, secret: &str) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => SessionError::InvalidSignature,
        _ => SessionError::Malformed,
    })?;

    if data.claims.kind != expected {
        return Err(SessionError::WrongKind);
    }
    Ok(data.claims)
}
