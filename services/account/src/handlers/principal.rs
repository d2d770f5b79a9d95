//! Request principal extractors.
//!
//! [`request_context`] installs a per-request [`RequestContext`] that
//! memoizes the resolved principal and remembers whether the session cookie
//! has gone stale; the extractors below read and fill it.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use tokio::sync::Mutex;

use accord_session::bearer::access_token_from_parts;
use accord_session::claims::{self, SessionKind};
use accord_session::cookie::{SESSION_COOKIE, TWO_FACTOR_COOKIE, clear_session_cookie};

use crate::domain::types::{OAuthGrant, User};
use crate::error::AccountServiceError;
use crate::state::AppState;
use crate::usecase::principal::{
    Principal, ResolvePrincipalInput, ResolvePrincipalUseCase, require_admin, require_login,
    require_oauth, require_two_factor_session,
};

#[derive(Default)]
struct ContextState {
    principal: Option<Option<Principal>>,
    clear_session: bool,
}

#[derive(Clone, Default)]
pub struct RequestContext(Arc<Mutex<ContextState>>);

impl RequestContext {
    async fn mark_stale_session(&self) {
        self.0.lock().await.clear_session = true;
    }

    async fn take_clear_session(&self) -> bool {
        std::mem::take(&mut self.0.lock().await.clear_session)
    }
}

/// Middleware: installs the request context and expires a stale session
/// cookie on the way out, unless the handler set a new session.
pub async fn request_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::default();
    req.extensions_mut().insert(ctx.clone());
    let resp = next.run(req).await;

    if !ctx.take_clear_session().await || sets_session_cookie(&resp) {
        return resp;
    }
    (clear_session_cookie(CookieJar::new(), &state.cookies), resp).into_response()
}

fn sets_session_cookie(resp: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

/// What the request presents, read synchronously from its parts.
struct Credentials {
    access_token: Option<String>,
    session_user_id: Option<i32>,
    invalid_session: bool,
}

fn credentials(parts: &Parts, state: &AppState) -> Credentials {
    let jar = CookieJar::from_headers(&parts.headers);
    let session = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .map(|token| claims::validate(&token, SessionKind::Login, &state.session_secret));
    let (session_user_id, invalid_session) = match session {
        Some(Ok(claims)) => (Some(claims.sub), false),
        Some(Err(e)) => {
            tracing::debug!(error = %e, "ignoring invalid session cookie");
            (None, true)
        }
        None => (None, false),
    };
    Credentials {
        access_token: access_token_from_parts(parts),
        session_user_id,
        invalid_session,
    }
}

fn two_factor_user_id(parts: &Parts, state: &AppState) -> Option<i32> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(TWO_FACTOR_COOKIE)?.value().to_owned();
    claims::validate(&token, SessionKind::TwoFactor, &state.session_secret)
        .ok()
        .map(|c| c.sub)
}

async fn resolve(
    state: &AppState,
    ctx: Option<RequestContext>,
    creds: Credentials,
) -> Result<Option<Principal>, AccountServiceError> {
    let ctx = ctx.unwrap_or_default();
    let mut guard = ctx.0.lock().await;
    if let Some(principal) = &guard.principal {
        return Ok(principal.clone());
    }

    let store = state.store();
    let resolved = ResolvePrincipalUseCase {
        users: store,
        clients: store,
        authorizations: store,
        groups: store,
    }
    .execute(ResolvePrincipalInput {
        access_token: creds.access_token,
        session_user_id: creds.session_user_id,
    })
    .await?;

    guard.principal = Some(resolved.principal.clone());
    drop(guard);
    if creds.invalid_session || resolved.stale_session {
        ctx.mark_stale_session().await;
    }
    Ok(resolved.principal)
}

// ── Extractors ───────────────────────────────────────────────────────────────

/// Principal of the request, if any. Fails only on an invalid access token.
pub struct CurrentPrincipal(pub Option<Principal>);

impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AccountServiceError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let creds = credentials(parts, state);
        let ctx = parts.extensions.get::<RequestContext>().cloned();
        let state = state.clone();
        async move { Ok(Self(resolve(&state, ctx, creds).await?)) }
    }
}

/// Active user behind the session or access token.
pub struct LoginUser(pub User);

impl FromRequestParts<AppState> for LoginUser {
    type Rejection = AccountServiceError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let creds = credentials(parts, state);
        let ctx = parts.extensions.get::<RequestContext>().cloned();
        let state = state.clone();
        async move {
            let principal = resolve(&state, ctx, creds).await?;
            Ok(Self(require_login(principal.as_ref())?.clone()))
        }
    }
}

/// Active member of the admin group.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AccountServiceError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let creds = credentials(parts, state);
        let ctx = parts.extensions.get::<RequestContext>().cloned();
        let state = state.clone();
        async move {
            let principal = resolve(&state, ctx, creds).await?;
            let user = require_admin(&state.store(), principal.as_ref()).await?;
            Ok(Self(user.clone()))
        }
    }
}

/// Grant behind a valid OAuth access token.
pub struct OAuthUser(pub OAuthGrant);

impl FromRequestParts<AppState> for OAuthUser {
    type Rejection = AccountServiceError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let creds = credentials(parts, state);
        let ctx = parts.extensions.get::<RequestContext>().cloned();
        let state = state.clone();
        async move {
            if creds.access_token.is_none() {
                return Err(AccountServiceError::OAuthTokenRequired);
            }
            let principal = resolve(&state, ctx, creds).await?;
            Ok(Self(require_oauth(principal.as_ref())?.clone()))
        }
    }
}

/// User whose password step succeeded and whose TOTP step is pending.
pub struct TwoFactorUser(pub User);

impl FromRequestParts<AppState> for TwoFactorUser {
    type Rejection = AccountServiceError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = two_factor_user_id(parts, state);
        let state = state.clone();
        async move {
            let user = require_two_factor_session(&state.store(), user_id).await?;
            Ok(Self(user))
        }
    }
}
