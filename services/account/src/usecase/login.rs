use chrono::{DateTime, Utc};

use crate::domain::repository::{ExternalAuthPort, LoginRecordRepository, UserRepository};
use crate::domain::types::{
    CredentialMode, LOGIN_RECORD_IP_MAX_LEN, LOGIN_RECORD_USER_AGENT_MAX_LEN, LoginOutcome,
    LoginRecord, User,
};
use crate::domain::validate::truncate_chars;
use crate::error::AccountServiceError;
use crate::usecase::account::find_by_name_or_email;
use crate::usecase::lockout::ensure_not_locked_out;
use crate::usecase::password::verify_password;
use crate::usecase::two_factor;

/// Client metadata stored on every login record.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    fn record(
        &self,
        user_id: i32,
        time: DateTime<Utc>,
        result: &Result<(), AccountServiceError>,
    ) -> LoginRecord {
        LoginRecord {
            user_id,
            time,
            ip: self
                .ip
                .as_deref()
                .map(|s| truncate_chars(s, LOGIN_RECORD_IP_MAX_LEN)),
            user_agent: self
                .user_agent
                .as_deref()
                .map(|s| truncate_chars(s, LOGIN_RECORD_USER_AGENT_MAX_LEN)),
            success: result.is_ok(),
            reason: result.as_ref().err().map(|e| e.kind().to_owned()),
        }
    }
}

/// Append the attempt to the audit log, then surface its outcome. An audit
/// failure fails the attempt.
async fn record_attempt<L: LoginRecordRepository>(
    login_records: &L,
    user: &User,
    client: &ClientInfo,
    now: DateTime<Utc>,
    result: Result<(), AccountServiceError>,
) -> Result<(), AccountServiceError> {
    login_records
        .append(&client.record(user.id, now, &result))
        .await?;
    match &result {
        Ok(()) => tracing::info!(user_id = user.id, "login succeeded"),
        Err(e) => tracing::info!(user_id = user.id, reason = e.kind(), "login failed"),
    }
    result
}

fn ensure_may_log_in(user: &User) -> Result<(), AccountServiceError> {
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    if !user.is_email_confirmed {
        return Err(AccountServiceError::EmailNotConfirmed);
    }
    Ok(())
}

async fn check_external<X: ExternalAuthPort>(
    external: &X,
    provider_id: &str,
    user: &User,
    password: &str,
) -> Result<(), AccountServiceError> {
    match external.check(provider_id, &user.name, password).await? {
        true => Ok(()),
        false => Err(AccountServiceError::WrongPassword),
    }
}

/// Credential check according to the user's external-auth mode.
pub async fn check_credentials<X: ExternalAuthPort>(
    external: &X,
    user: &User,
    password: &str,
) -> Result<(), AccountServiceError> {
    match user.credential_mode() {
        CredentialMode::Local => {
            if verify_password(password, &user.password_hash) {
                Ok(())
            } else {
                Err(AccountServiceError::WrongPassword)
            }
        }
        CredentialMode::LocalThenExternal(provider_id) => {
            if verify_password(password, &user.password_hash) {
                return Ok(());
            }
            check_external(external, provider_id, user, password).await
        }
        CredentialMode::ExternalOnly(provider_id) => {
            check_external(external, provider_id, user, password).await
        }
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub name_or_email: String,
    pub password: String,
    pub client: ClientInfo,
}

pub struct LoginUseCase<U: UserRepository, L: LoginRecordRepository, X: ExternalAuthPort> {
    pub users: U,
    pub login_records: L,
    pub external: X,
}

impl<U: UserRepository, L: LoginRecordRepository, X: ExternalAuthPort> LoginUseCase<U, L, X> {
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutcome, AccountServiceError> {
        let user = find_by_name_or_email(&self.users, &input.name_or_email)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        let now = Utc::now();
        ensure_not_locked_out(&self.login_records, user.id, now).await?;

        let result = match ensure_may_log_in(&user) {
            Ok(()) => check_credentials(&self.external, &user, &input.password).await,
            Err(e) => Err(e),
        };

        if result.is_ok() && user.is_two_factor_enabled {
            tracing::info!(user_id = user.id, "password accepted, two-factor pending");
            return Ok(LoginOutcome::TwoFactorRequired(user));
        }

        record_attempt(&self.login_records, &user, &input.client, now, result).await?;
        Ok(LoginOutcome::Authenticated(user))
    }
}

// ── TwoFactorLogin ───────────────────────────────────────────────────────────

pub struct TwoFactorLoginInput {
    pub user_id: i32,
    pub token: String,
    pub client: ClientInfo,
}

/// Second step of a login whose password step returned
/// [`LoginOutcome::TwoFactorRequired`].
pub struct TwoFactorLoginUseCase<U: UserRepository, L: LoginRecordRepository> {
    pub users: U,
    pub login_records: L,
    pub issuer: String,
}

impl<U: UserRepository, L: LoginRecordRepository> TwoFactorLoginUseCase<U, L> {
    pub async fn execute(&self, input: TwoFactorLoginInput) -> Result<User, AccountServiceError> {
        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AccountServiceError::TwoFactorSessionRequired)?;
        ensure_may_log_in(&user)?;
        if !user.is_two_factor_enabled {
            return Err(AccountServiceError::TwoFactorNotEnabled);
        }
        let now = Utc::now();
        ensure_not_locked_out(&self.login_records, user.id, now).await?;

        let result = match two_factor::verify_at(&user, &self.issuer, &input.token, now) {
            // Only one submission can spend a step.
            Ok(step) if self.users.advance_two_factor_step(user.id, step).await? => Ok(()),
            Ok(_) => Err(AccountServiceError::InvalidToken),
            Err(e) => Err(e),
        };
        record_attempt(&self.login_records, &user, &input.client, now, result).await?;
        Ok(user)
    }
}
