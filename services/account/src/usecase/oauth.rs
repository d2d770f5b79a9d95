use std::collections::HashSet;

use chrono::{Duration, Utc};
use url::form_urlencoded;

use crate::domain::repository::{
    GroupRepository, OAuthAuthorizationRepository, OAuthClientRepository, UserRepository,
};
use crate::domain::types::{
    AUTHORIZE_TOKEN_TTL_SECS, ClientProfileUpdate, NewClient, OAuthClient, OAuthGrant, User,
};
use crate::domain::validate::{validate_description, validate_name, validate_url};
use crate::error::AccountServiceError;
use crate::usecase::token::{generate_token, generate_unique_token};

/// Eligibility of `user` for `client`: active, and either the client is
/// public or the user shares a group with its allow-list.
pub async fn ensure_eligible<G: GroupRepository>(
    groups: &G,
    client: &OAuthClient,
    user: &User,
) -> Result<(), AccountServiceError> {
    if !user.is_active {
        return Err(AccountServiceError::InactiveUser);
    }
    if client.is_public {
        return Ok(());
    }
    let member_of = groups.groups_of_user(user.id).await?;
    if member_of
        .iter()
        .any(|g| client.allowed_group_ids.contains(&g.id))
    {
        Ok(())
    } else {
        Err(AccountServiceError::PermissionDenied)
    }
}

fn ensure_redirect_matches(
    client: &OAuthClient,
    redirect_url: &str,
) -> Result<(), AccountServiceError> {
    if client.redirect_url == redirect_url {
        Ok(())
    } else {
        Err(AccountServiceError::RedirectMismatch)
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), AccountServiceError> {
    if validate_url(value) {
        Ok(())
    } else {
        Err(AccountServiceError::InvalidUrl(field))
    }
}

fn check_description(value: &str) -> Result<(), AccountServiceError> {
    if validate_description(value) {
        Ok(())
    } else {
        Err(AccountServiceError::InvalidDescription)
    }
}

/// Append `key=value` to the query of `url`, keeping any fragment last.
///
/// Registered redirects are matched byte for byte, so they are not required
/// to parse as absolute URLs (`myapp://cb`, `/callback`).
pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = match base.rfind('?') {
        None => "?",
        Some(_) if base.ends_with('?') || base.ends_with('&') => "",
        Some(_) => "&",
    };
    let pair = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    match fragment {
        Some(fragment) => format!("{base}{separator}{pair}#{fragment}"),
        None => format!("{base}{separator}{pair}"),
    }
}

async fn load_client<C: OAuthClientRepository>(
    clients: &C,
    client_id: i32,
) -> Result<OAuthClient, AccountServiceError> {
    clients
        .find_by_id(client_id)
        .await?
        .ok_or(AccountServiceError::ClientNotFound)
}

// ── CreateClient ─────────────────────────────────────────────────────────────

pub struct CreateClientInput {
    pub name: String,
    pub redirect_url: String,
    pub home_url: Option<String>,
    pub description: Option<String>,
}

pub struct CreateClientUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> CreateClientUseCase<C> {
    pub async fn execute(
        &self,
        input: CreateClientInput,
    ) -> Result<OAuthClient, AccountServiceError> {
        if !validate_name(&input.name) {
            return Err(AccountServiceError::InvalidName);
        }
        check_url("redirect_url", &input.redirect_url)?;
        if let Some(ref home_url) = input.home_url {
            check_url("home_url", home_url)?;
        }
        if let Some(ref description) = input.description {
            check_description(description)?;
        }
        if self.clients.find_by_name(&input.name).await?.is_some() {
            return Err(AccountServiceError::DuplicateClientName);
        }

        let client = self
            .clients
            .create(&NewClient {
                name: input.name,
                secret: generate_token(),
                redirect_url: input.redirect_url,
                home_url: input.home_url,
                description: input.description,
            })
            .await?;
        tracing::info!(client_id = client.id, name = %client.name, "oauth client created");
        Ok(client)
    }
}

// ── UpdateClient ─────────────────────────────────────────────────────────────

pub struct UpdateClientUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> UpdateClientUseCase<C> {
    pub async fn execute(
        &self,
        client_id: i32,
        update: ClientProfileUpdate,
    ) -> Result<OAuthClient, AccountServiceError> {
        if update.is_empty() {
            return Err(AccountServiceError::MissingData);
        }
        let mut client = load_client(&self.clients, client_id).await?;

        if let Some(redirect_url) = update.redirect_url {
            check_url("redirect_url", &redirect_url)?;
            client.redirect_url = redirect_url;
        }
        if let Some(home_url) = update.home_url {
            if let Some(ref value) = home_url {
                check_url("home_url", value)?;
            }
            client.home_url = home_url;
        }
        if let Some(description) = update.description {
            if let Some(ref value) = description {
                check_description(value)?;
            }
            client.description = description;
        }
        if let Some(icon) = update.icon {
            if let Some(ref value) = icon {
                check_url("icon", value)?;
            }
            client.icon = icon;
        }

        self.clients.update(&client).await?;
        Ok(client)
    }
}

// ── RegenerateSecret ─────────────────────────────────────────────────────────

/// Rotation affects future code exchanges only; issued access tokens stay valid.
pub struct RegenerateSecretUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> RegenerateSecretUseCase<C> {
    pub async fn execute(&self, client_id: i32) -> Result<OAuthClient, AccountServiceError> {
        let mut client = load_client(&self.clients, client_id).await?;
        client.secret = generate_token();
        self.clients.update(&client).await?;
        tracing::info!(client_id, "oauth client secret rotated");
        Ok(client)
    }
}

// ── SetClientAccess ──────────────────────────────────────────────────────────

pub struct SetClientAccessInput {
    pub is_public: bool,
    pub allowed_group_ids: Vec<i32>,
}

pub struct SetClientAccessUseCase<C: OAuthClientRepository, G: GroupRepository> {
    pub clients: C,
    pub groups: G,
}

impl<C: OAuthClientRepository, G: GroupRepository> SetClientAccessUseCase<C, G> {
    pub async fn execute(
        &self,
        client_id: i32,
        input: SetClientAccessInput,
    ) -> Result<OAuthClient, AccountServiceError> {
        let mut client = load_client(&self.clients, client_id).await?;

        let mut group_ids: Vec<i32> = input
            .allowed_group_ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        group_ids.sort_unstable();
        for &group_id in &group_ids {
            if self.groups.find_by_id(group_id).await?.is_none() {
                return Err(AccountServiceError::GroupNotFound);
            }
        }

        client.is_public = input.is_public;
        client.allowed_group_ids = group_ids;
        self.clients.update(&client).await?;
        self.clients
            .set_allowed_groups(client.id, &client.allowed_group_ids)
            .await?;
        tracing::info!(
            client_id,
            is_public = client.is_public,
            groups = client.allowed_group_ids.len(),
            "oauth client access changed"
        );
        Ok(client)
    }
}

// ── DeleteClient ─────────────────────────────────────────────────────────────

pub struct DeleteClientUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> DeleteClientUseCase<C> {
    pub async fn execute(&self, client_id: i32) -> Result<(), AccountServiceError> {
        if !self.clients.delete(client_id).await? {
            return Err(AccountServiceError::ClientNotFound);
        }
        tracing::info!(client_id, "oauth client deleted");
        Ok(())
    }
}

// ── GetClient / ListClients ──────────────────────────────────────────────────

pub struct GetClientUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> GetClientUseCase<C> {
    pub async fn execute(&self, client_id: i32) -> Result<OAuthClient, AccountServiceError> {
        load_client(&self.clients, client_id).await
    }
}

pub struct ListClientsUseCase<C: OAuthClientRepository> {
    pub clients: C,
}

impl<C: OAuthClientRepository> ListClientsUseCase<C> {
    pub async fn execute(&self) -> Result<Vec<OAuthClient>, AccountServiceError> {
        self.clients.list().await
    }
}

// ── StartAuthorization ───────────────────────────────────────────────────────

pub struct StartAuthorizationInput {
    pub client_id: i32,
    pub redirect_url: String,
}

#[derive(Debug)]
pub struct Authorization {
    pub authorize_token: String,
    /// `redirect_url` with `code=<authorize_token>` appended.
    pub redirect_to: String,
}

pub struct StartAuthorizationUseCase<C, A, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    G: GroupRepository,
{
    pub clients: C,
    pub authorizations: A,
    pub groups: G,
}

impl<C, A, G> StartAuthorizationUseCase<C, A, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    G: GroupRepository,
{
    pub async fn execute(
        &self,
        user: &User,
        input: StartAuthorizationInput,
    ) -> Result<Authorization, AccountServiceError> {
        let client = load_client(&self.clients, input.client_id).await?;

        // 1. Exact redirect match, then eligibility
        ensure_redirect_matches(&client, &input.redirect_url)?;
        ensure_eligible(&self.groups, &client, user).await?;

        // 2. Fresh code, replacing any pending one for this pair
        let authorizations = &self.authorizations;
        let token = generate_unique_token(|t| async move {
            authorizations.authorize_token_exists(&t).await
        })
        .await?;
        let expire_at = Utc::now() + Duration::seconds(AUTHORIZE_TOKEN_TTL_SECS);
        self.authorizations
            .upsert_authorize_token(client.id, user.id, &token, expire_at)
            .await?;

        // 3. Hand the code back on the registered redirect
        let redirect_to = append_query_param(&client.redirect_url, "code", &token);

        tracing::info!(client_id = client.id, user_id = user.id, "authorization started");
        Ok(Authorization {
            authorize_token: token,
            redirect_to,
        })
    }
}

// ── GetAccessToken ───────────────────────────────────────────────────────────

pub struct GetAccessTokenInput {
    pub client_id: i32,
    pub secret: String,
    pub redirect_url: String,
    pub code: String,
}

pub struct GetAccessTokenUseCase<C, A, U, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
    G: GroupRepository,
{
    pub clients: C,
    pub authorizations: A,
    pub users: U,
    pub groups: G,
}

impl<C, A, U, G> GetAccessTokenUseCase<C, A, U, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
    G: GroupRepository,
{
    pub async fn execute(&self, input: GetAccessTokenInput) -> Result<String, AccountServiceError> {
        let client = load_client(&self.clients, input.client_id).await?;

        // 1. Client credentials
        ensure_redirect_matches(&client, &input.redirect_url)?;
        if client.secret != input.secret {
            return Err(AccountServiceError::WrongSecret);
        }

        // 2. Code
        let grant = self
            .authorizations
            .find_by_authorize_token(client.id, &input.code)
            .await?
            .ok_or(AccountServiceError::InvalidToken)?;
        match grant.authorize_token_expire_at {
            Some(expire_at) if expire_at >= Utc::now() => {}
            _ => return Err(AccountServiceError::TokenExpired),
        }

        // 3. The user must still be eligible
        let user = self
            .users
            .find_by_id(grant.user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound)?;
        ensure_eligible(&self.groups, &client, &user).await?;

        // 4. Exchange
        let authorizations = &self.authorizations;
        let access_token = generate_unique_token(|t| async move {
            authorizations.access_token_exists(&t).await
        })
        .await?;
        // The row lock serializes concurrent exchanges; only one sees the code.
        if !self
            .authorizations
            .redeem_authorize_token(client.id, user.id, &input.code, &access_token)
            .await?
        {
            tracing::warn!(
                client_id = client.id,
                user_id = user.id,
                "authorize code redeemed concurrently"
            );
            return Err(AccountServiceError::InvalidToken);
        }

        tracing::info!(client_id = client.id, user_id = user.id, "access token issued");
        Ok(access_token)
    }
}

// ── VerifyAccessToken ────────────────────────────────────────────────────────

pub struct VerifyAccessTokenUseCase<C, A, U, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
    G: GroupRepository,
{
    pub clients: C,
    pub authorizations: A,
    pub users: U,
    pub groups: G,
}

impl<C, A, U, G> VerifyAccessTokenUseCase<C, A, U, G>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
    G: GroupRepository,
{
    pub async fn execute(&self, access_token: &str) -> Result<OAuthGrant, AccountServiceError> {
        let grant = self
            .authorizations
            .find_by_access_token(access_token)
            .await?
            .ok_or(AccountServiceError::InvalidAccessToken)?;
        let client = self
            .clients
            .find_by_id(grant.client_id)
            .await?
            .ok_or(AccountServiceError::InvalidAccessToken)?;
        let user = self
            .users
            .find_by_id(grant.user_id)
            .await?
            .ok_or(AccountServiceError::InvalidAccessToken)?;
        ensure_eligible(&self.groups, &client, &user).await?;
        Ok(OAuthGrant { client, user })
    }
}

// ── ClearUserTokens ──────────────────────────────────────────────────────────

/// Revokes every code and access token the user holds, across all clients.
pub struct ClearUserTokensUseCase<A: OAuthAuthorizationRepository> {
    pub authorizations: A,
}

impl<A: OAuthAuthorizationRepository> ClearUserTokensUseCase<A> {
    pub async fn execute(&self, user_id: i32) -> Result<(), AccountServiceError> {
        let cleared = self.authorizations.clear_user_tokens(user_id).await?;
        tracing::info!(user_id, cleared, "oauth tokens cleared");
        Ok(())
    }
}

// ── GetClientsForUser ────────────────────────────────────────────────────────

pub struct GetClientsForUserUseCase<C: OAuthClientRepository, G: GroupRepository> {
    pub clients: C,
    pub groups: G,
}

impl<C: OAuthClientRepository, G: GroupRepository> GetClientsForUserUseCase<C, G> {
    pub async fn execute(&self, user: &User) -> Result<Vec<OAuthClient>, AccountServiceError> {
        let member_of: HashSet<i32> = self
            .groups
            .groups_of_user(user.id)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let clients = self.clients.list().await?;
        Ok(clients
            .into_iter()
            .filter(|c| {
                c.is_public || c.allowed_group_ids.iter().any(|id| member_of.contains(id))
            })
            .collect())
    }
}

// ── ListClientUsers ──────────────────────────────────────────────────────────

pub struct ListClientUsersUseCase<C, A, U>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
{
    pub clients: C,
    pub authorizations: A,
    pub users: U,
}

impl<C, A, U> ListClientUsersUseCase<C, A, U>
where
    C: OAuthClientRepository,
    A: OAuthAuthorizationRepository,
    U: UserRepository,
{
    pub async fn execute(&self, client_id: i32) -> Result<Vec<User>, AccountServiceError> {
        let client = load_client(&self.clients, client_id).await?;
        let mut users = Vec::new();
        for user_id in self.authorizations.user_ids_for_client(client.id).await? {
            if let Some(user) = self.users.find_by_id(user_id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }
}
