use chrono::Utc;
use serde_json::json;

use crate::domain::repository::{
    ExternalAuthPort, LoginRecordRepository, OutboxRepository, UserRepository,
};
use crate::domain::types::{
    LoginRecord, MailTemplate, NewUser, OutboxEvent, ProfileUpdate, TokenChannel, User,
};
use crate::domain::validate::{validate_email, validate_name, validate_nickname, validate_password};
use crate::error::AccountServiceError;
use crate::usecase::password::{hash_password, unusable_password_hash, verify_password};
use crate::usecase::token::generate_unique_token;
use crate::usecase::token_channel::{
    check_channel_token, deliver_channel_token, ensure_request_allowed, issue_channel_token,
};

/// Lookup by email when the input contains `@`, otherwise by name.
pub async fn find_by_name_or_email<U: UserRepository>(
    users: &U,
    name_or_email: &str,
) -> Result<Option<User>, AccountServiceError> {
    if name_or_email.contains('@') {
        users.find_by_email(name_or_email).await
    } else {
        users.find_by_name(name_or_email).await
    }
}

async fn ensure_unique_identity<U: UserRepository>(
    users: &U,
    name: &str,
    email: &str,
) -> Result<(), AccountServiceError> {
    if !validate_name(name) {
        return Err(AccountServiceError::InvalidName);
    }
    if !validate_email(email) {
        return Err(AccountServiceError::InvalidEmail);
    }
    if users.find_by_name(name).await?.is_some() {
        return Err(AccountServiceError::DuplicateName);
    }
    if users.find_by_email(email).await?.is_some() {
        return Err(AccountServiceError::DuplicateEmail);
    }
    Ok(())
}

// ── GetUser ──────────────────────────────────────────────────────────────────

pub struct GetUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetUserUseCase<U> {
    pub async fn execute(&self, user_id: i32) -> Result<User, AccountServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)
    }
}

// ── ListUsers ────────────────────────────────────────────────────────────────

pub struct ListUsersUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ListUsersUseCase<U> {
    pub async fn execute(&self) -> Result<Vec<User>, AccountServiceError> {
        self.users.list().await
    }
}

// ── InviteUser ───────────────────────────────────────────────────────────────

pub struct InviteUserInput {
    pub name: String,
    pub email: String,
}

/// Create an unconfirmed account with an unusable password and mail the
/// confirmation link; the invitee picks a password when confirming.
pub struct InviteUserUseCase<U: UserRepository, O: OutboxRepository> {
    pub users: U,
    pub outbox: O,
}

impl<U: UserRepository, O: OutboxRepository> InviteUserUseCase<U, O> {
    pub async fn execute(&self, input: InviteUserInput) -> Result<User, AccountServiceError> {
        ensure_unique_identity(&self.users, &input.name, &input.email).await?;

        let users = &self.users;
        let token = generate_unique_token(|t| async move {
            users
                .channel_token_exists(TokenChannel::EmailConfirm, &t)
                .await
        })
        .await?;
        let expire_at = Utc::now() + TokenChannel::EmailConfirm.validity();

        let user = self
            .users
            .create(&NewUser {
                name: input.name,
                email: input.email,
                password_hash: unusable_password_hash()?,
                is_email_confirmed: false,
                email_confirmed_at: None,
                email_confirm_token: Some(token.clone()),
                email_confirm_token_expire_at: Some(expire_at),
            })
            .await?;

        let event = OutboxEvent::mail(
            &user,
            MailTemplate::ConfirmEmail,
            json!({ "user_id": user.id, "token": token, "expire_at": expire_at, "invited": true }),
        );
        self.outbox.enqueue(&event).await?;
        tracing::info!(user_id = user.id, "user invited");
        Ok(user)
    }
}

// ── InitUser ─────────────────────────────────────────────────────────────────

pub struct InitUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Administrative creation of a pre-confirmed account.
pub struct InitUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> InitUserUseCase<U> {
    pub async fn execute(&self, input: InitUserInput) -> Result<User, AccountServiceError> {
        ensure_unique_identity(&self.users, &input.name, &input.email).await?;
        if !validate_password(&input.password) {
            return Err(AccountServiceError::InvalidPassword);
        }
        let user = self
            .users
            .create(&NewUser {
                name: input.name,
                email: input.email,
                password_hash: hash_password(&input.password)?,
                is_email_confirmed: true,
                email_confirmed_at: Some(Utc::now()),
                email_confirm_token: None,
                email_confirm_token_expire_at: None,
            })
            .await?;
        tracing::info!(user_id = user.id, "user initialized");
        Ok(user)
    }
}

// ── RequestReconfirmEmail ────────────────────────────────────────────────────

pub struct RequestReconfirmEmailUseCase<U: UserRepository, O: OutboxRepository> {
    pub users: U,
    pub outbox: O,
}

impl<U: UserRepository, O: OutboxRepository> RequestReconfirmEmailUseCase<U, O> {
    pub async fn execute(&self, name_or_email: &str) -> Result<User, AccountServiceError> {
        let mut user = find_by_name_or_email(&self.users, name_or_email)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        let now = Utc::now();
        ensure_request_allowed(&user, TokenChannel::EmailConfirm, now)?;

        user.is_email_confirmed = false;
        user.email_confirmed_at = None;
        issue_channel_token(
            &self.users,
            &self.outbox,
            user,
            TokenChannel::EmailConfirm,
            now,
        )
        .await
    }
}

// ── AdminReconfirmEmail ──────────────────────────────────────────────────────

/// Admin-triggered reconfirmation. No re-request wait applies.
pub struct AdminReconfirmEmailUseCase<U: UserRepository, O: OutboxRepository> {
    pub users: U,
    pub outbox: O,
}

impl<U: UserRepository, O: OutboxRepository> AdminReconfirmEmailUseCase<U, O> {
    pub async fn execute(&self, user_id: i32) -> Result<User, AccountServiceError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        if !user.is_active {
            return Err(AccountServiceError::InactiveUser);
        }

        user.is_email_confirmed = false;
        user.email_confirmed_at = None;
        let user = deliver_channel_token(
            &self.users,
            &self.outbox,
            user,
            TokenChannel::EmailConfirm,
            Utc::now(),
        )
        .await?;
        tracing::info!(user_id, "email reconfirmation forced");
        Ok(user)
    }
}

// ── RequestResetPassword ─────────────────────────────────────────────────────

pub struct RequestResetPasswordUseCase<U: UserRepository, O: OutboxRepository> {
    pub users: U,
    pub outbox: O,
}

impl<U: UserRepository, O: OutboxRepository> RequestResetPasswordUseCase<U, O> {
    pub async fn execute(&self, name_or_email: &str) -> Result<User, AccountServiceError> {
        let user = find_by_name_or_email(&self.users, name_or_email)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        issue_channel_token(
            &self.users,
            &self.outbox,
            user,
            TokenChannel::PasswordReset,
            Utc::now(),
        )
        .await
    }
}

// ── RequestDisableTwoFactorByEmail ───────────────────────────────────────────

pub struct RequestDisableTwoFactorByEmailUseCase<U: UserRepository, O: OutboxRepository> {
    pub users: U,
    pub outbox: O,
}

impl<U: UserRepository, O: OutboxRepository> RequestDisableTwoFactorByEmailUseCase<U, O> {
    pub async fn execute(&self, user_id: i32) -> Result<User, AccountServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        issue_channel_token(
            &self.users,
            &self.outbox,
            user,
            TokenChannel::TwoFactorDisable,
            Utc::now(),
        )
        .await
    }
}

// ── CheckChannelToken ────────────────────────────────────────────────────────

/// Pre-validates a mailed link before the form behind it is shown.
pub struct CheckChannelTokenUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> CheckChannelTokenUseCase<U> {
    pub async fn execute(
        &self,
        channel: TokenChannel,
        user_id: i32,
        token: &str,
    ) -> Result<(), AccountServiceError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        check_channel_token(&user, channel, token, Utc::now())
    }
}

// ── ConfirmEmail ─────────────────────────────────────────────────────────────

pub struct ConsumeTokenInput {
    pub user_id: i32,
    pub token: String,
    pub new_password: String,
}

pub struct ConfirmEmailUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ConfirmEmailUseCase<U> {
    pub async fn execute(&self, input: ConsumeTokenInput) -> Result<User, AccountServiceError> {
        let mut user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        let now = Utc::now();
        check_channel_token(&user, TokenChannel::EmailConfirm, &input.token, now)?;
        if !validate_password(&input.new_password) {
            return Err(AccountServiceError::InvalidPassword);
        }

        user.password_hash = hash_password(&input.new_password)?;
        user.set_channel_token(TokenChannel::EmailConfirm, None, None);
        user.is_email_confirmed = true;
        user.email_confirmed_at = Some(now);
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "email confirmed");
        Ok(user)
    }
}

// ── ResetPassword ────────────────────────────────────────────────────────────

pub struct ResetPasswordUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ResetPasswordUseCase<U> {
    pub async fn execute(&self, input: ConsumeTokenInput) -> Result<User, AccountServiceError> {
        let mut user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        check_channel_token(&user, TokenChannel::PasswordReset, &input.token, Utc::now())?;
        if !validate_password(&input.new_password) {
            return Err(AccountServiceError::InvalidPassword);
        }

        user.password_hash = hash_password(&input.new_password)?;
        user.set_channel_token(TokenChannel::PasswordReset, None, None);
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "password reset");
        Ok(user)
    }
}

// ── DisableTwoFactorByEmail ──────────────────────────────────────────────────

pub struct DisableTwoFactorByEmailUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> DisableTwoFactorByEmailUseCase<U> {
    pub async fn execute(&self, user_id: i32, token: &str) -> Result<User, AccountServiceError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        check_channel_token(&user, TokenChannel::TwoFactorDisable, token, Utc::now())?;

        user.set_channel_token(TokenChannel::TwoFactorDisable, None, None);
        user.two_factor_key = None;
        user.two_factor_last_step = None;
        user.is_two_factor_enabled = false;
        user.two_factor_setup_expire_at = None;
        self.users.update(&user).await?;
        tracing::info!(user_id = user.id, "two-factor disabled by email");
        Ok(user)
    }
}

// ── UpdatePassword ───────────────────────────────────────────────────────────

pub struct UpdatePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

pub struct UpdatePasswordUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdatePasswordUseCase<U> {
    pub async fn execute(
        &self,
        mut user: User,
        input: UpdatePasswordInput,
    ) -> Result<(), AccountServiceError> {
        if !user.is_active {
            return Err(AccountServiceError::InactiveUser);
        }
        if !validate_password(&input.new_password) {
            return Err(AccountServiceError::InvalidPassword);
        }
        if !verify_password(&input.old_password, &user.password_hash) {
            return Err(AccountServiceError::WrongPassword);
        }
        user.password_hash = hash_password(&input.new_password)?;
        self.users.update(&user).await
    }
}

// ── UpdateProfile ────────────────────────────────────────────────────────────

pub struct UpdateProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdateProfileUseCase<U> {
    pub async fn execute(
        &self,
        mut user: User,
        update: ProfileUpdate,
    ) -> Result<User, AccountServiceError> {
        if !user.is_active {
            return Err(AccountServiceError::InactiveUser);
        }
        if update.is_empty() {
            return Err(AccountServiceError::MissingData);
        }
        if let Some(nickname) = update.nickname {
            if let Some(ref value) = nickname {
                if !validate_nickname(value) {
                    return Err(AccountServiceError::InvalidNickname);
                }
                let taken = self.users.find_by_nickname(value).await?;
                if taken.is_some_and(|other| other.id != user.id) {
                    return Err(AccountServiceError::DuplicateNickname);
                }
            }
            user.nickname = nickname;
        }
        self.users.update(&user).await?;
        Ok(user)
    }
}

// ── SetActive ────────────────────────────────────────────────────────────────

pub struct SetActiveUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> SetActiveUseCase<U> {
    pub async fn execute(&self, user_id: i32, is_active: bool) -> Result<User, AccountServiceError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        user.is_active = is_active;
        self.users.update(&user).await?;
        tracing::info!(user_id, is_active, "user activity changed");
        Ok(user)
    }
}

// ── DeleteUser ───────────────────────────────────────────────────────────────

pub struct DeleteUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> DeleteUserUseCase<U> {
    pub async fn execute(&self, user_id: i32) -> Result<(), AccountServiceError> {
        if !self.users.delete(user_id).await? {
            return Err(AccountServiceError::UserNotFound);
        }
        tracing::info!(user_id, "user deleted");
        Ok(())
    }
}

// ── SetExternalAuth ──────────────────────────────────────────────────────────

pub struct SetExternalAuthInput {
    pub provider_id: Option<String>,
    pub enforced: bool,
}

pub struct SetExternalAuthUseCase<U: UserRepository, X: ExternalAuthPort> {
    pub users: U,
    pub external: X,
}

impl<U: UserRepository, X: ExternalAuthPort> SetExternalAuthUseCase<U, X> {
    pub async fn execute(
        &self,
        user_id: i32,
        input: SetExternalAuthInput,
    ) -> Result<User, AccountServiceError> {
        if let Some(ref id) = input.provider_id {
            if !self.external.has_provider(id) {
                return Err(AccountServiceError::UnknownExternalAuthProvider);
            }
        }
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        user.external_auth_enforced = input.provider_id.is_some() && input.enforced;
        user.external_auth_provider_id = input.provider_id;
        self.users.update(&user).await?;
        Ok(user)
    }
}

// ── ListLoginRecords ─────────────────────────────────────────────────────────

pub struct ListLoginRecordsUseCase<U: UserRepository, L: LoginRecordRepository> {
    pub users: U,
    pub login_records: L,
}

impl<U: UserRepository, L: LoginRecordRepository> ListLoginRecordsUseCase<U, L> {
    pub async fn execute(&self, user_id: i32) -> Result<Vec<LoginRecord>, AccountServiceError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AccountServiceError::UserNotFound);
        }
        self.login_records.list_for_user(user_id).await
    }
}
