use anyhow::Context as _;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ClientProfileUpdate, Group, GroupProfileUpdate, LoginRecord, OAuthClient, User, UserProfile,
};
use crate::error::AccountServiceError;
use crate::handlers::principal::AdminUser;
use crate::infra::db::DbStore;
use crate::state::AppState;
use crate::usecase::account::{
    AdminReconfirmEmailUseCase, DeleteUserUseCase, GetUserUseCase, InitUserInput, InitUserUseCase,
    InviteUserInput, InviteUserUseCase, ListLoginRecordsUseCase, ListUsersUseCase, SetActiveUseCase,
    SetExternalAuthInput, SetExternalAuthUseCase,
};
use crate::usecase::group::{
    AddMemberUseCase, CreateGroupInput, CreateGroupUseCase, DeleteGroupUseCase, GetGroupUseCase,
    ListGroupMembersUseCase, ListGroupsUseCase, ListUserGroupsUseCase, RemoveMemberUseCase,
    UpdateGroupUseCase,
};
use crate::usecase::oauth::{
    CreateClientInput, CreateClientUseCase, DeleteClientUseCase, GetClientUseCase,
    ListClientUsersUseCase, ListClientsUseCase, RegenerateSecretUseCase, SetClientAccessInput,
    SetClientAccessUseCase, UpdateClientUseCase,
};

fn profiles(users: &[User]) -> Vec<UserProfile> {
    users.iter().map(UserProfile::from).collect()
}

// ── Users ────────────────────────────────────────────────────────────────────

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserProfile>>, AccountServiceError> {
    let users = ListUsersUseCase {
        users: state.store(),
    }
    .execute()
    .await?;
    Ok(Json(profiles(&users)))
}

#[derive(Deserialize)]
pub struct InviteUserRequest {
    pub name: String,
    pub email: String,
}

pub async fn invite_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<InviteUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    let user = InviteUserUseCase {
        users: store,
        outbox: store,
    }
    .execute(InviteUserInput {
        name: body.name,
        email: body.email,
    })
    .await?;
    txn.commit().await.context("commit invitation")?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

#[derive(Deserialize)]
pub struct InitUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn init_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<InitUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = InitUserUseCase {
        users: DbStore::new(&txn),
    }
    .execute(InitUserInput {
        name: body.name,
        email: body.email,
        password: body.password,
    })
    .await?;
    txn.commit().await.context("commit user init")?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let user = GetUserUseCase {
        users: state.store(),
    }
    .execute(user_id)
    .await?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    DeleteUserUseCase {
        users: DbStore::new(&txn),
    }
    .execute(user_id)
    .await?;
    txn.commit().await.context("commit user delete")?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

pub async fn set_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
    Json(body): Json<SetActiveRequest>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = SetActiveUseCase {
        users: DbStore::new(&txn),
    }
    .execute(user_id, body.is_active)
    .await?;
    txn.commit().await.context("commit user activity")?;
    Ok(Json(UserProfile::from(&user)))
}

#[derive(Deserialize)]
pub struct SetExternalAuthRequest {
    pub provider_id: Option<String>,
    #[serde(default)]
    pub enforced: bool,
}

pub async fn set_external_auth(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
    Json(body): Json<SetExternalAuthRequest>,
) -> Result<Json<UserProfile>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let user = SetExternalAuthUseCase {
        users: DbStore::new(&txn),
        external: state.providers.clone(),
    }
    .execute(
        user_id,
        SetExternalAuthInput {
            provider_id: body.provider_id,
            enforced: body.enforced,
        },
    )
    .await?;
    txn.commit().await.context("commit external auth")?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn reconfirm_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    AdminReconfirmEmailUseCase {
        users: store,
        outbox: store,
    }
    .execute(user_id)
    .await?;
    txn.commit().await.context("commit forced reconfirm")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_login_records(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<LoginRecord>>, AccountServiceError> {
    let records = ListLoginRecordsUseCase {
        users: state.store(),
        login_records: state.login_record_repo(),
    }
    .execute(user_id)
    .await?;
    Ok(Json(records))
}

pub async fn list_user_groups(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<Group>>, AccountServiceError> {
    let store = state.store();
    let groups = ListUserGroupsUseCase {
        groups: store,
        users: store,
    }
    .execute(user_id)
    .await?;
    Ok(Json(groups))
}

// ── Groups ───────────────────────────────────────────────────────────────────

pub async fn list_groups(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Group>>, AccountServiceError> {
    let groups = ListGroupsUseCase {
        groups: state.store(),
    }
    .execute()
    .await?;
    Ok(Json(groups))
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_group(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let group = CreateGroupUseCase {
        groups: DbStore::new(&txn),
    }
    .execute(CreateGroupInput {
        name: body.name,
        description: body.description,
    })
    .await?;
    txn.commit().await.context("commit group create")?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(group_id): Path<i32>,
) -> Result<Json<Group>, AccountServiceError> {
    let group = GetGroupUseCase {
        groups: state.store(),
    }
    .execute(group_id)
    .await?;
    Ok(Json(group))
}

pub async fn update_group(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(group_id): Path<i32>,
    Json(body): Json<GroupProfileUpdate>,
) -> Result<Json<Group>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let group = UpdateGroupUseCase {
        groups: DbStore::new(&txn),
    }
    .execute(group_id, body)
    .await?;
    txn.commit().await.context("commit group update")?;
    Ok(Json(group))
}

pub async fn list_group_members(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(group_id): Path<i32>,
) -> Result<Json<Vec<UserProfile>>, AccountServiceError> {
    let store = state.store();
    let members = ListGroupMembersUseCase {
        groups: store,
        users: store,
    }
    .execute(group_id)
    .await?;
    Ok(Json(profiles(&members)))
}

pub async fn delete_group(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(group_id): Path<i32>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    DeleteGroupUseCase {
        groups: DbStore::new(&txn),
    }
    .execute(group_id)
    .await?;
    txn.commit().await.context("commit group delete")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((group_id, user_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    AddMemberUseCase {
        groups: store,
        users: store,
    }
    .execute(group_id, user_id)
    .await?;
    txn.commit().await.context("commit group member add")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((group_id, user_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    RemoveMemberUseCase {
        groups: DbStore::new(&txn),
    }
    .execute(group_id, user_id)
    .await?;
    txn.commit().await.context("commit group member remove")?;
    Ok(StatusCode::NO_CONTENT)
}

// ── OAuth clients ────────────────────────────────────────────────────────────

/// Client as shown to administrators, secret included.
#[derive(Serialize)]
pub struct AdminClientResponse {
    #[serde(flatten)]
    pub client: OAuthClient,
    pub secret: String,
}

impl From<OAuthClient> for AdminClientResponse {
    fn from(client: OAuthClient) -> Self {
        let secret = client.secret.clone();
        Self { client, secret }
    }
}

pub async fn list_clients(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<AdminClientResponse>>, AccountServiceError> {
    let clients = ListClientsUseCase {
        clients: state.store(),
    }
    .execute()
    .await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub redirect_url: String,
    pub home_url: Option<String>,
    pub description: Option<String>,
}

pub async fn create_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<AdminClientResponse>), AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let client = CreateClientUseCase {
        clients: DbStore::new(&txn),
    }
    .execute(CreateClientInput {
        name: body.name,
        redirect_url: body.redirect_url,
        home_url: body.home_url,
        description: body.description,
    })
    .await?;
    txn.commit().await.context("commit client create")?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

pub async fn get_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
) -> Result<Json<AdminClientResponse>, AccountServiceError> {
    let client = GetClientUseCase {
        clients: state.store(),
    }
    .execute(client_id)
    .await?;
    Ok(Json(client.into()))
}

pub async fn update_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
    Json(body): Json<ClientProfileUpdate>,
) -> Result<Json<AdminClientResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let client = UpdateClientUseCase {
        clients: DbStore::new(&txn),
    }
    .execute(client_id, body)
    .await?;
    txn.commit().await.context("commit client update")?;
    Ok(Json(client.into()))
}

pub async fn delete_client(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
) -> Result<StatusCode, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    DeleteClientUseCase {
        clients: DbStore::new(&txn),
    }
    .execute(client_id)
    .await?;
    txn.commit().await.context("commit client delete")?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_secret(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
) -> Result<Json<AdminClientResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let client = RegenerateSecretUseCase {
        clients: DbStore::new(&txn),
    }
    .execute(client_id)
    .await?;
    txn.commit().await.context("commit secret rotation")?;
    Ok(Json(client.into()))
}

#[derive(Deserialize)]
pub struct SetClientAccessRequest {
    pub is_public: bool,
    #[serde(default)]
    pub allowed_group_ids: Vec<i32>,
}

pub async fn set_client_access(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
    Json(body): Json<SetClientAccessRequest>,
) -> Result<Json<AdminClientResponse>, AccountServiceError> {
    let txn = state.db.begin().await.context("begin transaction")?;
    let store = DbStore::new(&txn);
    let client = SetClientAccessUseCase {
        clients: store,
        groups: store,
    }
    .execute(
        client_id,
        SetClientAccessInput {
            is_public: body.is_public,
            allowed_group_ids: body.allowed_group_ids,
        },
    )
    .await?;
    txn.commit().await.context("commit client access")?;
    Ok(Json(client.into()))
}

pub async fn list_client_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(client_id): Path<i32>,
) -> Result<Json<Vec<UserProfile>>, AccountServiceError> {
    let store = state.store();
    let users = ListClientUsersUseCase {
        clients: store,
        authorizations: store,
        users: store,
    }
    .execute(client_id)
    .await?;
    Ok(Json(profiles(&users)))
}
