use anyhow::Context as _;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use accord_session::claims::{
    self, BROWSER_SESSION_TTL, REMEMBERED_SESSION_TTL, SessionKind, TWO_FACTOR_SESSION_TTL,
};
use accord_session::cookie::{
    clear_session_cookie, clear_two_factor_cookie, set_session_cookie, set_two_factor_cookie,
};

use crate::domain::repository::ExternalAuthPort;
use crate::domain::types::{
    ExternalAuthProviderInfo, LoginOutcome, OAuthClient, ProfileUpdate, TokenChannel, User,
    UserProfile,
};
use crate::error::AccountServiceError;
use crate::handlers::principal::{CurrentPrincipal, LoginUser};
use crate::infra::db::DbStore;
use crate::state::AppState;
use crate::usecase::account::{
    CheckChannelTokenUseCase, ConfirmEmailUseCase, ConsumeTokenInput,
    RequestReconfirmEmailUseCase, RequestResetPasswordUseCase, ResetPasswordUseCase,
    UpdatePasswordInput, UpdatePasswordUseCase, UpdateProfileUseCase,
};
use crate::usecase::login::{ClientInfo, LoginInput, LoginUseCase};
use crate::usecase::oauth::{ClearUserTokensUseCase, GetClientsForUserUseCase};
use crate::usecase::principal::Principal;

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client address as reported by the fronting proxy, and user agent.
pub(crate) fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip = header_str(headers, X_REAL_IP).or_else(|| {
        header_str(headers, X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
    });
    ClientInfo {
        ip: ip.map(str::to_owned),
        user_agent: header_str(headers, USER_AGENT.as_str()).map(str::to_owned),
    }
}

/// Issue the login session cookie for `user`.
pub(crate) fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    remember: bool,
) -> Result<CookieJar, AccountServiceError> {
    let ttl = if remember {
        REMEMBERED_SESSION_TTL
    } else {
        BROWSER_SESSION_TTL
    };
    let (token, _) = claims::issue(user.id, SessionKind::Login, ttl, &state.session_secret)
        .context("sign session")?;
    let jar = set_session_cookie(jar, token, remember, &state.cookies);
    Ok(clear_two_factor_cookie(jar, &state.cookies))
}

// ── POST /account/login ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub name_or_email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub two_factor_required: bool,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AccountServiceError> {
    let outcome = LoginUseCase {
        users: state.store(),
        login_records: state.login_record_repo(),
        external: state.providers.clone(),
    }
    .execute(LoginInput {
        name_or_email: body.name_or_email,
        password: body.password,
        client: client_info(&headers),
    })
    .await?;

    match outcome {
        LoginOutcome::Authenticated(user) => {
            let jar = start_session(&state, jar, &user, body.remember)?;
            let resp = LoginResponse {
                user: UserProfile::from(&user),
                two_factor_required: false,
            };
            Ok((jar, Json(resp)))
        }
        LoginOutcome::TwoFactorRequired(user) => {
            let (token, _) = claims::issue(
                user.id,
                SessionKind::TwoFactor,
                TWO_FACTOR_SESSION_TTL,
                &state.session_secret,
            )
            .context("sign two-factor session")?;
            let jar = set_two_factor_cookie(jar, token, &state.cookies);
            let resp = LoginResponse {
                user: UserProfile::from(&user),
                two_factor_required: true,
            };
            Ok((jar, Json(resp)))
        }
    }
}

// ── GET /account/logout ──────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    jar: CookieJar,
) -> Result<impl IntoResponse, AccountServiceError> {
    let jar = clear_session_cookie(jar, &state.cookies);
    let jar = clear_two_factor_cookie(jar, &state.cookies);

    if let Some(Principal::Session(user)) = principal {
        let txn = state.db.begin().await.context("begin transaction")?;
        ClearUserTokensUseCase {
            authorizations: DbStore::new(&txn),
        }
        .execute(user.id)
        .await?;
        txn.commit().await.context("commit logout")?;
        tracing::info!(user_id = user.id, "logged out");
    }
    Ok((StatusCode::NO_CONTENT, jar))
}

// ── GET /account/whoami ──────────────────────────────────────────────────────

pub async fn whoami(
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<axum::response::Response, AccountServiceError> {
    match principal.as_ref().map(Principal::user) {
        Some(user) if user.is_active => Ok(Json(UserProfile::from(user)).into_response()),
        _ => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

// ── /account/me ──────────────────────────────────────────────────────────────

pub async fn get_me(LoginUser(user): LoginUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

pub async fn update_me(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = UpdateProfileUseCase {
        users: DbStore::new(&txn),
    }
    .execute(user, body)
    .await?;
    txn.commit().await.context("commit profile update")?;
    Ok(Json(UserProfile::from(&user)))
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    UpdatePasswordUseCase {
        users: DbStore::new(&txn),
    }
    .execute(
        user,
        UpdatePasswordInput {
            old_password: body.old_password,
            new_password: body.new_password,
        },
    )
    .await?;
    txn.commit().await.context("commit password update")?;
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /account/clients ─────────────────────────────────────────────────────

pub async fn list_my_clients(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
) -> Result<Json<Vec<OAuthClient>>, AccountServiceError> {
    let store = state.store();
    let clients = GetClientsForUserUseCase {
        clients: store,
        groups: store,
    }
    .execute(&user)
    .await?;
    Ok(Json(clients))
}

// ── Token channels ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CheckTokenQuery {
    pub user_id: i32,
    pub token: String,
}

#[derive(Deserialize)]
pub struct ConsumeTokenRequest {
    pub user_id: i32,
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct NameOrEmailRequest {
    pub name_or_email: String,
}

pub(crate) async fn check_token(
    state: &AppState,
    channel: TokenChannel,
    query: CheckTokenQuery,
) -> Result<StatusCode, AccountServiceError> {
    CheckChannelTokenUseCase {
        users: state.store(),
    }
    .execute(channel, query.user_id, &query.token)
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_confirm_email(
    State(state): State<AppState>,
    Query(query): Query<CheckTokenQuery>,
) -> Result<StatusCode, AccountServiceError> {
    check_token(&state, TokenChannel::EmailConfirm, query).await
}

pub async fn confirm_email(
    State(state): State<AppState>,
    Json(body): Json<ConsumeTokenRequest>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = ConfirmEmailUseCase {
        users: DbStore::new(&txn),
    }
    .execute(ConsumeTokenInput {
        user_id: body.user_id,
        token: body.token,
        new_password: body.new_password,
    })
    .await?;
    txn.commit().await.context("commit email confirmation")?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn request_reconfirm_email(
    State(state): State<AppState>,
    Json(body): Json<NameOrEmailRequest>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    RequestReconfirmEmailUseCase {
        users: store,
        outbox: store,
    }
    .execute(&body.name_or_email)
    .await?;
    txn.commit().await.context("commit reconfirm request")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn request_reset_password(
    State(state): State<AppState>,
    Json(body): Json<NameOrEmailRequest>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    RequestResetPasswordUseCase {
        users: store,
        outbox: store,
    }
    .execute(&body.name_or_email)
    .await?;
    txn.commit().await.context("commit reset request")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_reset_password(
    State(state): State<AppState>,
    Query(query): Query<CheckTokenQuery>,
) -> Result<StatusCode, AccountServiceError> {
    check_token(&state, TokenChannel::PasswordReset, query).await
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ConsumeTokenRequest>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    ResetPasswordUseCase {
        users: DbStore::new(&txn),
    }
    .execute(ConsumeTokenInput {
        user_id: body.user_id,
        token: body.token,
        new_password: body.new_password,
    })
    .await?;
    txn.commit().await.context("commit password reset")?;
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /account/external-auth-providers ─────────────────────────────────────

pub async fn list_external_auth_providers(
    State(state): State<AppState>,
) -> Json<Vec<ExternalAuthProviderInfo>> {
    Json(state.providers.providers())
}
