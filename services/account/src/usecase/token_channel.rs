//! Request / check / consume lifecycle shared by the email-confirm,
//! password-reset and two-factor-disable channels.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::domain::repository::{OutboxRepository, UserRepository};
use crate::domain::types::{OutboxEvent, TOKEN_REREQUEST_WAIT_SECS, TokenChannel, User};
use crate::error::AccountServiceError;
use crate::usecase::token::generate_unique_token;

/// Seconds the caller must still wait before re-requesting, if any.
///
/// A live token was issued at `expiry - validity`; a new one may be issued
/// once the minimum wait has passed since then.
pub fn rerequest_wait_secs(user: &User, channel: TokenChannel, now: DateTime<Utc>) -> Option<i64> {
    let (token, expiry) = user.channel_token(channel);
    let expiry = expiry.filter(|e| token.is_some() && *e > now)?;
    let wait = expiry - channel.validity() + Duration::seconds(TOKEN_REREQUEST_WAIT_SECS) - now;
    let millis = wait.num_milliseconds();
    (millis > 0).then(|| (millis + 999) / 1000)
}

/// Preconditions of the request step.
pub fn ensure_request_allowed(
    user: &User,
    channel: TokenChannel,
    now: DateTime<Utc>,
) -> Result<(), AccountServiceError> {
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    if channel != TokenChannel::TwoFactorDisable && user.email.is_empty() {
        return Err(AccountServiceError::InvalidEmail);
    }
    if channel == TokenChannel::TwoFactorDisable && !user.is_two_factor_enabled {
        return Err(AccountServiceError::TwoFactorNotEnabled);
    }
    if let Some(retry_after_seconds) = rerequest_wait_secs(user, channel, now) {
        return Err(AccountServiceError::RateLimited {
            retry_after_seconds,
        });
    }
    Ok(())
}

/// Issue a fresh token on `channel`, persist it and enqueue the matching mail.
pub async fn issue_channel_token<U, O>(
    users: &U,
    outbox: &O,
    user: User,
    channel: TokenChannel,
    now: DateTime<Utc>,
) -> Result<User, AccountServiceError>
where
    U: UserRepository,
    O: OutboxRepository,
{
    ensure_request_allowed(&user, channel, now)?;
    deliver_channel_token(users, outbox, user, channel, now).await
}

/// Write a fresh token on `channel` and enqueue its mail, skipping the
/// request-step checks. Replaces any live token.
pub async fn deliver_channel_token<U, O>(
    users: &U,
    outbox: &O,
    mut user: User,
    channel: TokenChannel,
    now: DateTime<Utc>,
) -> Result<User, AccountServiceError>
where
    U: UserRepository,
    O: OutboxRepository,
{
    let token =
        generate_unique_token(|t| async move { users.channel_token_exists(channel, &t).await })
            .await?;
    let expire_at = now + channel.validity();
    user.set_channel_token(channel, Some(token.clone()), Some(expire_at));
    users.update(&user).await?;

    let event = OutboxEvent::mail(
        &user,
        channel.template(),
        json!({ "user_id": user.id, "token": token, "expire_at": expire_at }),
    );
    outbox.enqueue(&event).await?;

    tracing::info!(user_id = user.id, channel = ?channel, "channel token issued");
    Ok(user)
}

/// Validate `token` without consuming it.
///
/// Order: active, not already in the end state, token present, token equal,
/// token not expired.
pub fn check_channel_token(
    user: &User,
    channel: TokenChannel,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), AccountServiceError> {
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    match channel {
        TokenChannel::EmailConfirm if user.is_email_confirmed => {
            return Err(AccountServiceError::AlreadyConfirmed);
        }
        TokenChannel::TwoFactorDisable if !user.is_two_factor_enabled => {
            return Err(AccountServiceError::TwoFactorNotEnabled);
        }
        _ => {}
    }
    let (stored, expiry) = user.channel_token(channel);
    let stored = stored.ok_or(AccountServiceError::NoActiveRequest)?;
    if stored != token {
        return Err(AccountServiceError::InvalidToken);
    }
    match expiry {
        Some(expiry) if expiry >= now => Ok(()),
        _ => Err(AccountServiceError::TokenExpired),
    }
}
