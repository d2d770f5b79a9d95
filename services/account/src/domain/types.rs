use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Account record with every credential channel inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
    /// PHC string (argon2id).
    pub password_hash: String,
    pub is_active: bool,
    pub is_email_confirmed: bool,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub email_confirm_token: Option<String>,
    pub email_confirm_token_expire_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expire_at: Option<DateTime<Utc>>,
    pub two_factor_key: Option<Vec<u8>>,
    pub is_two_factor_enabled: bool,
    pub two_factor_setup_expire_at: Option<DateTime<Utc>>,
    pub two_factor_last_step: Option<i64>,
    pub two_factor_disable_token: Option<String>,
    pub two_factor_disable_token_expire_at: Option<DateTime<Utc>>,
    pub external_auth_provider_id: Option<String>,
    pub external_auth_enforced: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl User {
    /// Current `(token, expiry)` pair of a token channel.
    pub fn channel_token(&self, channel: TokenChannel) -> (Option<&str>, Option<DateTime<Utc>>) {
        match channel {
            TokenChannel::EmailConfirm => (
                self.email_confirm_token.as_deref(),
                self.email_confirm_token_expire_at,
            ),
            TokenChannel::PasswordReset => (
                self.password_reset_token.as_deref(),
                self.password_reset_token_expire_at,
            ),
            TokenChannel::TwoFactorDisable => (
                self.two_factor_disable_token.as_deref(),
                self.two_factor_disable_token_expire_at,
            ),
        }
    }

    pub fn set_channel_token(
        &mut self,
        channel: TokenChannel,
        token: Option<String>,
        expire_at: Option<DateTime<Utc>>,
    ) {
        match channel {
            TokenChannel::EmailConfirm => {
                self.email_confirm_token = token;
                self.email_confirm_token_expire_at = expire_at;
            }
            TokenChannel::PasswordReset => {
                self.password_reset_token = token;
                self.password_reset_token_expire_at = expire_at;
            }
            TokenChannel::TwoFactorDisable => {
                self.two_factor_disable_token = token;
                self.two_factor_disable_token_expire_at = expire_at;
            }
        }
    }

    /// Credential check mode derived from the external-auth columns.
    pub fn credential_mode(&self) -> CredentialMode<'_> {
        match (&self.external_auth_provider_id, self.external_auth_enforced) {
            (None, _) => CredentialMode::Local,
            (Some(id), false) => CredentialMode::LocalThenExternal(id),
            (Some(id), true) => CredentialMode::ExternalOnly(id),
        }
    }
}

/// Fields needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_email_confirmed: bool,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub email_confirm_token: Option<String>,
    pub email_confirm_token_expire_at: Option<DateTime<Utc>>,
}

/// Public projection returned by the API. Never carries secrets.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
    pub is_active: bool,
    pub is_email_confirmed: bool,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub is_two_factor_enabled: bool,
    pub external_auth_provider_id: Option<String>,
    pub external_auth_enforced: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            is_active: user.is_active,
            is_email_confirmed: user.is_email_confirmed,
            email_confirmed_at: user.email_confirmed_at,
            is_two_factor_enabled: user.is_two_factor_enabled,
            external_auth_provider_id: user.external_auth_provider_id.clone(),
            external_auth_enforced: user.external_auth_enforced,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode<'a> {
    /// Local password hash only.
    Local,
    /// Local hash first, provider on mismatch.
    LocalThenExternal(&'a str),
    /// Provider only.
    ExternalOnly(&'a str),
}

/// Typed profile update. `None` leaves a field unchanged; `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub nickname: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Typed group update; only the description is mutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupProfileUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl GroupProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
    }
}

/// One login attempt. Written once, never updated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginRecord {
    pub user_id: i32,
    pub time: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OAuthClient {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub redirect_url: String,
    pub home_url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_public: bool,
    pub allowed_group_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub secret: String,
    pub redirect_url: String,
    pub home_url: Option<String>,
    pub description: Option<String>,
}

/// Typed client profile update. Same `Option<Option<_>>` convention as
/// [`ProfileUpdate`]; `redirect_url` cannot be cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientProfileUpdate {
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub home_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
}

impl ClientProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.redirect_url.is_none()
            && self.home_url.is_none()
            && self.description.is_none()
            && self.icon.is_none()
    }
}

/// Grant state for one (client, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthAuthorization {
    pub client_id: i32,
    pub user_id: i32,
    pub authorize_token: Option<String>,
    pub authorize_token_expire_at: Option<DateTime<Utc>>,
    pub access_token: Option<String>,
}

/// Verified access token: the grant plus the principal it stands for.
#[derive(Debug, Clone)]
pub struct OAuthGrant {
    pub client: OAuthClient,
    pub user: User,
}

/// Outbox event for async delivery (mail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

impl OutboxEvent {
    /// Mail to `user` rendered from `template` by the delivery worker.
    pub fn mail(user: &User, template: MailTemplate, variables: serde_json::Value) -> Self {
        let id = Uuid::now_v7();
        Self {
            id,
            kind: format!("mail.{}", template.as_str()),
            payload: json!({
                "recipient": user.email,
                "name": user.nickname.as_deref().unwrap_or(&user.name),
                "template": template.as_str(),
                "variables": variables,
            }),
            idempotency_key: format!("mail.{}:{}:{id}", template.as_str(), user.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    ConfirmEmail,
    ResetPassword,
    DisableTwoFactor,
}

impl MailTemplate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmEmail => "confirm_email",
            Self::ResetPassword => "reset_password",
            Self::DisableTwoFactor => "disable_two_factor",
        }
    }
}

/// Independent token channels sharing the request / check / consume lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenChannel {
    EmailConfirm,
    PasswordReset,
    TwoFactorDisable,
}

impl TokenChannel {
    pub fn validity(self) -> Duration {
        match self {
            Self::EmailConfirm => Duration::seconds(EMAIL_CONFIRM_TTL_SECS),
            Self::PasswordReset => Duration::seconds(PASSWORD_RESET_TTL_SECS),
            Self::TwoFactorDisable => Duration::seconds(TWO_FACTOR_DISABLE_TTL_SECS),
        }
    }

    pub fn template(self) -> MailTemplate {
        match self {
            Self::EmailConfirm => MailTemplate::ConfirmEmail,
            Self::PasswordReset => MailTemplate::ResetPassword,
            Self::TwoFactorDisable => MailTemplate::DisableTwoFactor,
        }
    }
}

/// Outcome of a successful credential check.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Session may be established.
    Authenticated(User),
    /// Password accepted; a TOTP code must follow.
    TwoFactorRequired(User),
}

/// Public descriptor of a configured external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalAuthProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub update_password_url: Option<String>,
    #[serde(default)]
    pub reset_password_url: Option<String>,
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Email-confirmation token lifetime (30 days).
pub const EMAIL_CONFIRM_TTL_SECS: i64 = 30 * 24 * 3600;

/// Password-reset token lifetime (15 minutes).
pub const PASSWORD_RESET_TTL_SECS: i64 = 15 * 60;

/// Two-factor-disable-by-email token lifetime (15 minutes).
pub const TWO_FACTOR_DISABLE_TTL_SECS: i64 = 15 * 60;

/// Minimum wait before a channel token may be re-requested.
pub const TOKEN_REREQUEST_WAIT_SECS: i64 = 60;

/// Trailing window scanned for consecutive login failures.
pub const LOCKOUT_WINDOW_SECS: i64 = 15 * 60;

/// Consecutive failures that lock an account.
pub const LOCKOUT_THRESHOLD: usize = 5;

/// Wait reported to a locked-out caller.
pub const LOCKOUT_WAIT_MINUTES: i64 = 15;

/// Window between TOTP setup and its confirmation.
pub const TWO_FACTOR_SETUP_TTL_SECS: i64 = 60;

/// OAuth authorize token (code) lifetime.
pub const AUTHORIZE_TOKEN_TTL_SECS: i64 = 60;

/// Attempts at drawing a non-colliding token.
pub const TOKEN_MAX_RETRIES: usize = 5;

/// Membership in this group grants administrative access.
pub const ADMIN_GROUP: &str = "admin";

pub const LOGIN_RECORD_IP_MAX_LEN: usize = 64;
pub const LOGIN_RECORD_USER_AGENT_MAX_LEN: usize = 128;
