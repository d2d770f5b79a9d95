use anyhow::Context as _;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::domain::types::{TokenChannel, UserProfile};
use crate::error::AccountServiceError;
use crate::handlers::account::{CheckTokenQuery, check_token, client_info, start_session};
use crate::handlers::principal::{LoginUser, TwoFactorUser};
use crate::infra::db::DbStore;
use crate::state::AppState;
use crate::usecase::account::{
    DisableTwoFactorByEmailUseCase, RequestDisableTwoFactorByEmailUseCase,
};
use crate::usecase::login::{TwoFactorLoginInput, TwoFactorLoginUseCase};
use crate::usecase::two_factor::{
    ConfirmTwoFactorSetupUseCase, DisableTwoFactorUseCase, SetupTwoFactorUseCase, build_uri,
};

#[derive(Serialize)]
pub struct UriResponse {
    pub uri: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

// ── POST /account/two-factor/setup ───────────────────────────────────────────

pub async fn setup(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
) -> Result<Json<UriResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let uri = SetupTwoFactorUseCase {
        users: DbStore::new(&txn),
        issuer: state.totp_issuer.clone(),
    }
    .execute(user)
    .await?;
    txn.commit().await.context("commit two-factor setup")?;
    Ok(Json(UriResponse { uri }))
}

// ── GET /account/two-factor/uri ──────────────────────────────────────────────

pub async fn provisioning_uri(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
) -> Result<Json<UriResponse>, AccountServiceError> {
    let uri = build_uri(&user, &state.totp_issuer)?;
    Ok(Json(UriResponse { uri }))
}

// ── POST /account/two-factor/confirm-setup ───────────────────────────────────

pub async fn confirm_setup(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Json(body): Json<TokenRequest>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = ConfirmTwoFactorSetupUseCase {
        users: DbStore::new(&txn),
        issuer: state.totp_issuer.clone(),
    }
    .execute(user, &body.token)
    .await?;
    txn.commit().await.context("commit two-factor confirmation")?;
    Ok(Json(UserProfile::from(&user)))
}

// ── POST /account/two-factor/disable ─────────────────────────────────────────

pub async fn disable(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Json(body): Json<TokenRequest>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = DisableTwoFactorUseCase {
        users: DbStore::new(&txn),
        issuer: state.totp_issuer.clone(),
    }
    .execute(user, &body.token)
    .await?;
    txn.commit().await.context("commit two-factor disable")?;
    Ok(Json(UserProfile::from(&user)))
}

// ── POST /account/two-factor/login ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct TwoFactorLoginRequest {
    pub token: String,
    #[serde(default)]
    pub remember: bool,
}

pub async fn login(
    State(state): State<AppState>,
    TwoFactorUser(user): TwoFactorUser,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<TwoFactorLoginRequest>,
) -> Result<impl IntoResponse, AccountServiceError> {
    let user = TwoFactorLoginUseCase {
        users: state.store(),
        login_records: state.login_record_repo(),
        issuer: state.totp_issuer.clone(),
    }
    .execute(TwoFactorLoginInput {
        user_id: user.id,
        token: body.token,
        client: client_info(&headers),
    })
    .await?;
    let jar = start_session(&state, jar, &user, body.remember)?;
    Ok((jar, Json(UserProfile::from(&user))))
}

// ── POST /account/two-factor/request-disable-by-email ────────────────────────

pub async fn request_disable_by_email(
    State(state): State<AppState>,
    TwoFactorUser(user): TwoFactorUser,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    RequestDisableTwoFactorByEmailUseCase {
        users: store,
        outbox: store,
    }
    .execute(user.id)
    .await?;
    txn.commit().await.context("commit disable-by-email request")?;
    Ok(StatusCode::NO_CONTENT)
}

// ── /account/two-factor/disable-by-email ─────────────────────────────────────

pub async fn check_disable_by_email(
    State(state): State<AppState>,
    Query(query): Query<CheckTokenQuery>,
) -> Result<StatusCode, AccountServiceError> {
    check_token(&state, TokenChannel::TwoFactorDisable, query).await
}

#[derive(Deserialize)]
pub struct DisableByEmailRequest {
    pub user_id: i32,
    pub token: String,
}

pub async fn disable_by_email(
    State(state): State<AppState>,
    Json(body): Json<DisableByEmailRequest>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    DisableTwoFactorByEmailUseCase {
        users: DbStore::new(&txn),
    }
    .execute(body.user_id, &body.token)
    .await?;
    txn.commit().await.context("commit disable-by-email")?;
    Ok(StatusCode::NO_CONTENT)
}
