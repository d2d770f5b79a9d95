use anyhow::Context as _;
use axum::{
    Json,
    extract::{Query, State},
};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::domain::types::UserProfile;
use crate::error::AccountServiceError;
use crate::handlers::principal::{LoginUser, OAuthUser};
use crate::infra::db::DbStore;
use crate::state::AppState;
use crate::usecase::oauth::{
    GetAccessTokenInput, GetAccessTokenUseCase, StartAuthorizationInput,
    StartAuthorizationUseCase,
};

// ── GET /oauth/connect ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConnectQuery {
    pub client_id: i32,
    pub redirect_url: String,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub redirect_url: String,
}

pub async fn connect(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Query(query): Query<ConnectQuery>,
) -> Result<Json<ConnectResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    let authorization = StartAuthorizationUseCase {
        clients: store,
        authorizations: store,
        groups: store,
    }
    .execute(
        &user,
        StartAuthorizationInput {
            client_id: query.client_id,
            redirect_url: query.redirect_url,
        },
    )
    .await?;
    txn.commit().await.context("commit authorization")?;
    Ok(Json(ConnectResponse {
        redirect_url: authorization.redirect_to,
    }))
}

// ── POST /oauth/token ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TokenQuery {
    pub client_id: i32,
    pub client_secret: String,
    pub redirect_url: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub scope: &'static str,
}

/// Called server-to-server by the client; authenticated by its secret.
pub async fn token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    let access_token = GetAccessTokenUseCase {
        clients: store,
        authorizations: store,
        users: store,
        groups: store,
    }
    .execute(GetAccessTokenInput {
        client_id: query.client_id,
        secret: query.client_secret,
        redirect_url: query.redirect_url,
        code: query.code,
    })
    .await?;
    txn.commit().await.context("commit access token")?;
    Ok(Json(TokenResponse {
        access_token,
        scope: "*",
    }))
}

// ── GET /oauth/me ────────────────────────────────────────────────────────────

pub async fn me(OAuthUser(grant): OAuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&grant.user))
}
