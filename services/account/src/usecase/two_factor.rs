//! TOTP enrollment and verification.
//!
//! SHA-1, 6 digits, 30 second step, one step of clock skew either way,
//! 160-bit secrets.

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use totp_rs::{Algorithm, TOTP};

use crate::domain::repository::UserRepository;
use crate::domain::types::{TWO_FACTOR_SETUP_TTL_SECS, User};
use crate::error::AccountServiceError;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_SKEW: u8 = 1;
pub const TOTP_STEP_SECS: u64 = 30;
pub const TOTP_SECRET_BYTES: usize = 20;

pub fn generate_secret() -> Vec<u8> {
    rand::random::<[u8; TOTP_SECRET_BYTES]>().to_vec()
}

/// TOTP generator for `secret`, labelled with the account name and issuer.
pub fn totp(secret: &[u8], account: &str, issuer: &str) -> Result<TOTP, AccountServiceError> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP_SECS,
        secret.to_vec(),
        Some(issuer.to_owned()),
        account.to_owned(),
    )
    .map_err(|e| anyhow!("build totp: {e}").into())
}

fn user_totp(user: &User, issuer: &str) -> Result<TOTP, AccountServiceError> {
    let key = user
        .two_factor_key
        .as_deref()
        .ok_or(AccountServiceError::TwoFactorNotInitialized)?;
    totp(key, &user.name, issuer)
}

/// Provisioning URI (`otpauth://totp/...`) for authenticator apps.
pub fn build_uri(user: &User, issuer: &str) -> Result<String, AccountServiceError> {
    Ok(user_totp(user, issuer)?.get_url())
}

/// Check `token` against the user's secret at `now` and return the time step
/// it was generated for.
///
/// Steps at or below `two_factor_last_step` are spent and fail like a wrong
/// code.
pub fn verify_at(
    user: &User,
    issuer: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<i64, AccountServiceError> {
    let mut totp = user_totp(user, issuer)?;
    // Each candidate step is checked on its own.
    totp.skew = 0;
    let at = u64::try_from(now.timestamp()).map_err(|_| anyhow!("clock before epoch"))?;
    let current = at / TOTP_STEP_SECS;
    let skew = u64::from(TOTP_SKEW);
    let token = token.trim();

    let step = (current.saturating_sub(skew)..=current + skew)
        .find(|step| totp.check(token, step * TOTP_STEP_SECS))
        .ok_or(AccountServiceError::InvalidToken)?;
    let step = i64::try_from(step).map_err(|_| anyhow!("totp step out of range"))?;
    if user.two_factor_last_step.is_some_and(|last| step <= last) {
        tracing::warn!(user_id = user.id, step, "spent totp code presented");
        return Err(AccountServiceError::InvalidToken);
    }
    Ok(step)
}

pub fn verify(user: &User, issuer: &str, token: &str) -> Result<i64, AccountServiceError> {
    verify_at(user, issuer, token, Utc::now())
}

// ── SetupTwoFactor ───────────────────────────────────────────────────────────

/// Replaces any pending secret; the new one must be confirmed within the
/// setup window.
pub struct SetupTwoFactorUseCase<U: UserRepository> {
    pub users: U,
    pub issuer: String,
}

impl<U: UserRepository> SetupTwoFactorUseCase<U> {
    /// Returns the provisioning URI of the new secret.
    pub async fn execute(&self, mut user: User) -> Result<String, AccountServiceError> {
        if user.is_two_factor_enabled {
            return Err(AccountServiceError::TwoFactorAlreadyEnabled);
        }
        user.two_factor_key = Some(generate_secret());
        user.two_factor_last_step = None;
        user.is_two_factor_enabled = false;
        user.two_factor_setup_expire_at =
            Some(Utc::now() + Duration::seconds(TWO_FACTOR_SETUP_TTL_SECS));
        let uri = build_uri(&user, &self.issuer)?;
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "two-factor setup started");
        Ok(uri)
    }
}

// ── ConfirmTwoFactorSetup ────────────────────────────────────────────────────

pub struct ConfirmTwoFactorSetupUseCase<U: UserRepository> {
    pub users: U,
    pub issuer: String,
}

impl<U: UserRepository> ConfirmTwoFactorSetupUseCase<U> {
    pub async fn execute(&self, mut user: User, token: &str) -> Result<User, AccountServiceError> {
        if user.is_two_factor_enabled {
            return Err(AccountServiceError::TwoFactorAlreadyEnabled);
        }
        let now = Utc::now();
        match user.two_factor_setup_expire_at {
            Some(expire_at) if expire_at >= now => {}
            _ => return Err(AccountServiceError::TwoFactorSetupExpired),
        }
        let step = verify_at(&user, &self.issuer, token, now)?;

        user.is_two_factor_enabled = true;
        user.two_factor_last_step = Some(step);
        user.two_factor_setup_expire_at = None;
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "two-factor enabled");
        Ok(user)
    }
}

// ── DisableTwoFactor ─────────────────────────────────────────────────────────

pub struct DisableTwoFactorUseCase<U: UserRepository> {
    pub users: U,
    pub issuer: String,
}

impl<U: UserRepository> DisableTwoFactorUseCase<U> {
    pub async fn execute(&self, mut user: User, token: &str) -> Result<User, AccountServiceError> {
        if !user.is_two_factor_enabled {
            return Err(AccountServiceError::TwoFactorNotEnabled);
        }
        verify(&user, &self.issuer, token)?;

        user.is_two_factor_enabled = false;
        user.two_factor_key = None;
        user.two_factor_last_step = None;
        user.two_factor_setup_expire_at = None;
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "two-factor disabled");
        Ok(user)
    }
}
