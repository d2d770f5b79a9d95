//! Who is calling: resolution of the request principal and the access
//! guards built on it.

use crate::domain::repository::{
    GroupRepository, OAuthAuthorizationRepository, OAuthClientRepository, UserRepository,
};
use crate::domain::types::{ADMIN_GROUP, OAuthGrant, User};
use crate::error::AccountServiceError;
use crate::usecase::oauth::VerifyAccessTokenUseCase;

/// Authenticated caller of a request.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Browser session cookie.
    Session(User),
    /// OAuth access token presented by a third-party client.
    OAuth(OAuthGrant),
}

impl Principal {
    pub fn user(&self) -> &User {
        match self {
            Self::Session(user) => user,
            Self::OAuth(grant) => &grant.user,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvePrincipalInput {
    pub access_token: Option<String>,
    pub session_user_id: Option<i32>,
}

#[derive(Debug, Default)]
pub struct ResolvedPrincipal {
    pub principal: Option<Principal>,
    /// The session named a user that no longer exists.
    pub stale_session: bool,
}

// ── ResolvePrincipal ─────────────────────────────────────────────────────────

/// OAuth access token first, session second. A presented but invalid access
/// token is an error rather than a fallback to the session.
pub struct ResolvePrincipalUseCase<U, C, A, G>
where
    U: UserRepository,
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    G: GroupRepository,
{
    pub users: U,
    pub clients: C,
    pub authorizations: A,
    pub groups: G,
}

impl<U, C, A, G> ResolvePrincipalUseCase<U, C, A, G>
where
    U: UserRepository + Clone,
    C: OAuthClientRepository + Clone,
    A: OAuthAuthorizationRepository + Clone,
    G: GroupRepository + Clone,
{
    pub async fn execute(
        &self,
        input: ResolvePrincipalInput,
    ) -> Result<ResolvedPrincipal, AccountServiceError> {
        if let Some(token) = input.access_token {
            let grant = VerifyAccessTokenUseCase {
                clients: self.clients.clone(),
                authorizations: self.authorizations.clone(),
                users: self.users.clone(),
                groups: self.groups.clone(),
            }
            .execute(&token)
            .await?;
            return Ok(ResolvedPrincipal {
                principal: Some(Principal::OAuth(grant)),
                stale_session: false,
            });
        }

        let Some(user_id) = input.session_user_id else {
            return Ok(ResolvedPrincipal::default());
        };
        match self.users.find_by_id(user_id).await? {
            Some(user) => Ok(ResolvedPrincipal {
                principal: Some(Principal::Session(user)),
                stale_session: false,
            }),
            None => {
                tracing::info!(user_id, "session refers to a deleted user");
                Ok(ResolvedPrincipal {
                    principal: None,
                    stale_session: true,
                })
            }
        }
    }
}

// ── Guards ───────────────────────────────────────────────────────────────────

pub fn require_login(principal: Option<&Principal>) -> Result<&User, AccountServiceError> {
    let user = principal
        .map(Principal::user)
        .ok_or(AccountServiceError::LoginRequired)?;
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    Ok(user)
}

async fn is_member_of_any<G: GroupRepository>(
    groups: &G,
    user: &User,
    names: &[&str],
) -> Result<bool, AccountServiceError> {
    Ok(groups
        .groups_of_user(user.id)
        .await?
        .iter()
        .any(|g| names.contains(&g.name.as_str())))
}

pub async fn require_admin<'p, G: GroupRepository>(
    groups: &G,
    principal: Option<&'p Principal>,
) -> Result<&'p User, AccountServiceError> {
    let user = require_login(principal)?;
    if !is_member_of_any(groups, user, &[ADMIN_GROUP]).await? {
        return Err(AccountServiceError::AdminRequired);
    }
    Ok(user)
}

/// Membership in any one of `names` suffices.
pub async fn require_groups<'p, G: GroupRepository>(
    groups: &G,
    principal: Option<&'p Principal>,
    names: &[&str],
) -> Result<&'p User, AccountServiceError> {
    let user = require_login(principal)?;
    if !is_member_of_any(groups, user, names).await? {
        return Err(AccountServiceError::GroupRequired(names.join("/")));
    }
    Ok(user)
}

pub fn require_oauth(principal: Option<&Principal>) -> Result<&OAuthGrant, AccountServiceError> {
    match principal {
        Some(Principal::OAuth(grant)) if grant.user.is_active => Ok(grant),
        Some(Principal::OAuth(_)) => Err(AccountServiceError::InactiveUser),
        _ => Err(AccountServiceError::OAuthTokenRequired),
    }
}

/// User behind a pending two-factor session.
pub async fn require_two_factor_session<U: UserRepository>(
    users: &U,
    user_id: Option<i32>,
) -> Result<User, AccountServiceError> {
    let user_id = user_id.ok_or(AccountServiceError::TwoFactorSessionRequired)?;
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AccountServiceError::TwoFactorSessionRequired)?;
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    Ok(user)
}
