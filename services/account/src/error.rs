use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};

/// Failure of an external password verifier. Never carries the password.
#[derive(Debug, thiserror::Error)]
pub enum ExternalAuthError {
    #[error("external auth provider not configured")]
    UnknownProvider(String),
    #[error("external auth provider unreachable")]
    Unreachable(String),
    #[error("unexpected external auth response")]
    UnexpectedResponse(String),
}

impl ExternalAuthError {
    /// Upstream error text. Logged only; it may name internal hosts.
    pub fn upstream_detail(&self) -> &str {
        match self {
            Self::UnknownProvider(d) | Self::Unreachable(d) | Self::UnexpectedResponse(d) => d,
        }
    }
}

/// Account service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    // validation
    #[error("invalid name format")]
    InvalidName,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("invalid nickname format")]
    InvalidNickname,
    #[error("invalid password format")]
    InvalidPassword,
    #[error("invalid group name format")]
    InvalidGroupName,
    #[error("invalid {0}")]
    InvalidUrl(&'static str),
    #[error("description too long")]
    InvalidDescription,
    #[error("nothing to update")]
    MissingData,

    // business rules
    #[error("duplicate name")]
    DuplicateName,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("duplicate nickname")]
    DuplicateNickname,
    #[error("duplicate group name")]
    DuplicateGroupName,
    #[error("duplicate client name")]
    DuplicateClientName,
    #[error("wrong password")]
    WrongPassword,
    #[error("already confirmed")]
    AlreadyConfirmed,
    #[error("no active request")]
    NoActiveRequest,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,
    #[error("two-factor authentication is not enabled")]
    TwoFactorNotEnabled,
    #[error("two-factor key is not initialized")]
    TwoFactorNotInitialized,
    #[error("two-factor setup expired")]
    TwoFactorSetupExpired,
    #[error("redirect_url mismatch")]
    RedirectMismatch,
    #[error("wrong client secret")]
    WrongSecret,
    #[error("unknown external auth provider")]
    UnknownExternalAuthProvider,
    #[error("oauth access token required")]
    OAuthTokenRequired,

    // principal
    #[error("login required")]
    LoginRequired,
    #[error("two-factor session required")]
    TwoFactorSessionRequired,
    #[error("inactive user")]
    InactiveUser,
    #[error("email not confirmed")]
    EmailNotConfirmed,
    #[error("permission denied")]
    PermissionDenied,
    #[error("admin required")]
    AdminRequired,
    #[error("group {0} required")]
    GroupRequired(String),
    #[error("invalid access token")]
    InvalidAccessToken,

    // lookups
    #[error("user not found")]
    UserNotFound,
    #[error("group not found")]
    GroupNotFound,
    #[error("client not found")]
    ClientNotFound,

    // rate limits
    #[error("too many requests")]
    RateLimited { retry_after_seconds: i64 },
    #[error("too many login failures")]
    TooManyFailures { wait_minutes: i64 },

    // infrastructure
    #[error("external auth error")]
    ExternalAuth(#[from] ExternalAuthError),
    #[error("token space exhausted")]
    TokenSpaceExhausted,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AccountServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidNickname => "INVALID_NICKNAME",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidGroupName => "INVALID_GROUP_NAME",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::InvalidDescription => "INVALID_DESCRIPTION",
            Self::MissingData => "MISSING_DATA",
            Self::DuplicateName => "DUPLICATE_NAME",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::DuplicateNickname => "DUPLICATE_NICKNAME",
            Self::DuplicateGroupName => "DUPLICATE_GROUP_NAME",
            Self::DuplicateClientName => "DUPLICATE_CLIENT_NAME",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::AlreadyConfirmed => "ALREADY_CONFIRMED",
            Self::NoActiveRequest => "NO_ACTIVE_REQUEST",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TwoFactorAlreadyEnabled => "TWO_FACTOR_ALREADY_ENABLED",
            Self::TwoFactorNotEnabled => "TWO_FACTOR_NOT_ENABLED",
            Self::TwoFactorNotInitialized => "TWO_FACTOR_NOT_INITIALIZED",
            Self::TwoFactorSetupExpired => "TWO_FACTOR_SETUP_EXPIRED",
            Self::RedirectMismatch => "REDIRECT_MISMATCH",
            Self::WrongSecret => "WRONG_SECRET",
            Self::UnknownExternalAuthProvider => "UNKNOWN_EXTERNAL_AUTH_PROVIDER",
            Self::OAuthTokenRequired => "OAUTH_TOKEN_REQUIRED",
            Self::LoginRequired => "LOGIN_REQUIRED",
            Self::TwoFactorSessionRequired => "TWO_FACTOR_SESSION_REQUIRED",
            Self::InactiveUser => "INACTIVE_USER",
            Self::EmailNotConfirmed => "EMAIL_NOT_CONFIRMED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::GroupRequired(_) => "GROUP_REQUIRED",
            Self::InvalidAccessToken => "INVALID_ACCESS_TOKEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::GroupNotFound => "GROUP_NOT_FOUND",
            Self::ClientNotFound => "CLIENT_NOT_FOUND",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::TooManyFailures { .. } => "TOO_MANY_FAILURES",
            Self::ExternalAuth(_) => "EXTERNAL_AUTH_ERROR",
            Self::TokenSpaceExhausted => "TOKEN_SPACE_EXHAUSTED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Optional human-readable elaboration of [`kind`](Self::kind).
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::RateLimited {
                retry_after_seconds,
            } => Some(format!("retry after {retry_after_seconds} seconds")),
            Self::TooManyFailures { wait_minutes } => {
                Some(format!("try again in {wait_minutes} minutes"))
            }
            Self::ExternalAuth(e) => Some(e.to_string()),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::LoginRequired | Self::TwoFactorSessionRequired => StatusCode::UNAUTHORIZED,
            Self::InactiveUser
            | Self::EmailNotConfirmed
            | Self::PermissionDenied
            | Self::AdminRequired
            | Self::GroupRequired(_)
            | Self::InvalidAccessToken => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::GroupNotFound | Self::ClientNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::RateLimited { .. } | Self::TooManyFailures { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::ExternalAuth(_) | Self::TokenSpaceExhausted | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            Self::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            Self::TooManyFailures { wait_minutes } => Some(wait_minutes * 60),
            _ => None,
        }
    }
}

impl IntoResponse for AccountServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are recorded by the trace layer; only infrastructure failures are logged here.
        match &self {
            Self::Internal(e) => tracing::error!(error = %e, kind = "INTERNAL", "internal error"),
            Self::ExternalAuth(e) => tracing::warn!(
                error = %e,
                upstream = e.upstream_detail(),
                kind = self.kind(),
                "external auth error"
            ),
            _ => {}
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Some(detail) = self.detail() {
            body["detail"] = serde_json::Value::String(detail);
        }
        let mut resp = (status, axum::Json(body)).into_response();
        if let Some(secs) = self.retry_after_seconds() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                resp.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        resp
    }
}
