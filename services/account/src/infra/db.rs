use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
    sea_query::OnConflict,
};

use accord_account_schema::{
    groups, login_records, oauth_authorizations, oauth_client_groups, oauth_clients,
    outbox_events, user_groups, users,
};

use crate::domain::repository::{
    GroupRepository, LoginRecordRepository, OAuthAuthorizationRepository, OAuthClientRepository,
    OutboxRepository, UserRepository,
};
use crate::domain::types::{
    Group, LoginRecord, NewClient, NewUser, OAuthAuthorization, OAuthClient, OutboxEvent,
    TokenChannel, User,
};
use crate::error::AccountServiceError;

/// Repository view over one connection or transaction.
///
/// Handlers open a transaction, hand copies of the store to their use cases
/// and commit once the use case returns.
pub struct DbStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DbStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

impl<C: ConnectionTrait> Clone for DbStore<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ConnectionTrait> Copy for DbStore<'_, C> {}

// ── User repository ──────────────────────────────────────────────────────────

impl<C: ConnectionTrait> UserRepository for DbStore<'_, C> {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AccountServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AccountServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(self.conn)
            .await
            .context("find user by name")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(self.conn)
            .await
            .context("find user by email")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<User>, AccountServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Nickname.eq(nickname))
            .one(self.conn)
            .await
            .context("find user by nickname")?;
        Ok(model.map(user_from_model))
    }

    async fn list(&self) -> Result<Vec<User>, AccountServiceError> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(self.conn)
            .await
            .context("list users")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }

    async fn create(&self, user: &NewUser) -> Result<User, AccountServiceError> {
        let now = Utc::now();
        let model = users::ActiveModel {
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            nickname: Set(None),
            password: Set(user.password_hash.clone()),
            is_active: Set(true),
            is_email_confirmed: Set(user.is_email_confirmed),
            email_confirmed_at: Set(user.email_confirmed_at),
            email_confirm_token: Set(user.email_confirm_token.clone()),
            email_confirm_token_expire_at: Set(user.email_confirm_token_expire_at),
            password_reset_token: Set(None),
            password_reset_token_expire_at: Set(None),
            two_factor_key: Set(None),
            is_two_factor_enabled: Set(false),
            two_factor_setup_expire_at: Set(None),
            two_factor_last_step: Set(None),
            two_factor_disable_token: Set(None),
            two_factor_disable_token_expire_at: Set(None),
            external_auth_provider_id: Set(None),
            external_auth_enforced: Set(false),
            created_at: Set(now),
            modified_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("create user")?;
        Ok(user_from_model(model))
    }

    async fn update(&self, user: &User) -> Result<(), AccountServiceError> {
        users::ActiveModel {
            id: Set(user.id),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            nickname: Set(user.nickname.clone()),
            password: Set(user.password_hash.clone()),
            is_active: Set(user.is_active),
            is_email_confirmed: Set(user.is_email_confirmed),
            email_confirmed_at: Set(user.email_confirmed_at),
            email_confirm_token: Set(user.email_confirm_token.clone()),
            email_confirm_token_expire_at: Set(user.email_confirm_token_expire_at),
            password_reset_token: Set(user.password_reset_token.clone()),
            password_reset_token_expire_at: Set(user.password_reset_token_expire_at),
            two_factor_key: Set(user.two_factor_key.clone()),
            is_two_factor_enabled: Set(user.is_two_factor_enabled),
            two_factor_setup_expire_at: Set(user.two_factor_setup_expire_at),
            two_factor_last_step: Set(user.two_factor_last_step),
            two_factor_disable_token: Set(user.two_factor_disable_token.clone()),
            two_factor_disable_token_expire_at: Set(user.two_factor_disable_token_expire_at),
            external_auth_provider_id: Set(user.external_auth_provider_id.clone()),
            external_auth_enforced: Set(user.external_auth_enforced),
            created_at: Set(user.created_at),
            modified_at: Set(Utc::now()),
        }
        .update(self.conn)
        .await
        .context("update user")?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError> {
        let result = users::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("delete user")?;
        Ok(result.rows_affected > 0)
    }

    async fn channel_token_exists(
        &self,
        channel: TokenChannel,
        token: &str,
    ) -> Result<bool, AccountServiceError> {
        let column = match channel {
            TokenChannel::EmailConfirm => users::Column::EmailConfirmToken,
            TokenChannel::PasswordReset => users::Column::PasswordResetToken,
            TokenChannel::TwoFactorDisable => users::Column::TwoFactorDisableToken,
        };
        let count = users::Entity::find()
            .filter(column.eq(token))
            .count(self.conn)
            .await
            .context("check channel token")?;
        Ok(count > 0)
    }

    async fn advance_two_factor_step(
        &self,
        user_id: i32,
        step: i64,
    ) -> Result<bool, AccountServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::TwoFactorLastStep, Expr::value(Some(step)))
            .filter(users::Column::Id.eq(user_id))
            .filter(
                Condition::any()
                    .add(users::Column::TwoFactorLastStep.is_null())
                    .add(users::Column::TwoFactorLastStep.lt(step)),
            )
            .exec(self.conn)
            .await
            .context("advance two-factor step")?;
        Ok(result.rows_affected == 1)
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        nickname: model.nickname,
        password_hash: model.password,
        is_active: model.is_active,
        is_email_confirmed: model.is_email_confirmed,
        email_confirmed_at: model.email_confirmed_at,
        email_confirm_token: model.email_confirm_token,
        email_confirm_token_expire_at: model.email_confirm_token_expire_at,
        password_reset_token: model.password_reset_token,
        password_reset_token_expire_at: model.password_reset_token_expire_at,
        two_factor_key: model.two_factor_key,
        is_two_factor_enabled: model.is_two_factor_enabled,
        two_factor_setup_expire_at: model.two_factor_setup_expire_at,
        two_factor_last_step: model.two_factor_last_step,
        two_factor_disable_token: model.two_factor_disable_token,
        two_factor_disable_token_expire_at: model.two_factor_disable_token_expire_at,
        external_auth_provider_id: model.external_auth_provider_id,
        external_auth_enforced: model.external_auth_enforced,
        created_at: model.created_at,
        modified_at: model.modified_at,
    }
}

// ── Group repository ─────────────────────────────────────────────────────────

impl<C: ConnectionTrait> GroupRepository for DbStore<'_, C> {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, AccountServiceError> {
        let model = groups::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("find group by id")?;
        Ok(model.map(group_from_model))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, AccountServiceError> {
        let model = groups::Entity::find()
            .filter(groups::Column::Name.eq(name))
            .one(self.conn)
            .await
            .context("find group by name")?;
        Ok(model.map(group_from_model))
    }

    async fn list(&self) -> Result<Vec<Group>, AccountServiceError> {
        let models = groups::Entity::find()
            .order_by_asc(groups::Column::Name)
            .all(self.conn)
            .await
            .context("list groups")?;
        Ok(models.into_iter().map(group_from_model).collect())
    }

    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, AccountServiceError> {
        let now = Utc::now();
        let model = groups::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(description.map(str::to_owned)),
            created_at: Set(now),
            modified_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("create group")?;
        Ok(group_from_model(model))
    }

    async fn update(&self, group: &Group) -> Result<(), AccountServiceError> {
        groups::ActiveModel {
            id: Set(group.id),
            description: Set(group.description.clone()),
            modified_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(self.conn)
        .await
        .context("update group")?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError> {
        let result = groups::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("delete group")?;
        Ok(result.rows_affected > 0)
    }

    async fn add_member(&self, group_id: i32, user_id: i32) -> Result<(), AccountServiceError> {
        user_groups::Entity::insert(user_groups::ActiveModel {
            user_id: Set(user_id),
            group_id: Set(group_id),
        })
        .on_conflict(
            OnConflict::columns([user_groups::Column::UserId, user_groups::Column::GroupId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self.conn)
        .await
        .context("add group member")?;
        Ok(())
    }

    async fn remove_member(
        &self,
        group_id: i32,
        user_id: i32,
    ) -> Result<bool, AccountServiceError> {
        let result = user_groups::Entity::delete_many()
            .filter(user_groups::Column::GroupId.eq(group_id))
            .filter(user_groups::Column::UserId.eq(user_id))
            .exec(self.conn)
            .await
            .context("remove group member")?;
        Ok(result.rows_affected > 0)
    }

    async fn groups_of_user(&self, user_id: i32) -> Result<Vec<Group>, AccountServiceError> {
        let group_ids: Vec<i32> = user_groups::Entity::find()
            .filter(user_groups::Column::UserId.eq(user_id))
            .all(self.conn)
            .await
            .context("list memberships of user")?
            .into_iter()
            .map(|m| m.group_id)
            .collect();
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .order_by_asc(groups::Column::Name)
            .all(self.conn)
            .await
            .context("list groups of user")?;
        Ok(models.into_iter().map(group_from_model).collect())
    }

    async fn member_ids(&self, group_id: i32) -> Result<Vec<i32>, AccountServiceError> {
        let rows = user_groups::Entity::find()
            .filter(user_groups::Column::GroupId.eq(group_id))
            .order_by_asc(user_groups::Column::UserId)
            .all(self.conn)
            .await
            .context("list members of group")?;
        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }
}

fn group_from_model(model: groups::Model) -> Group {
    Group {
        id: model.id,
        name: model.name,
        description: model.description,
    }
}

// ── OAuth client repository ──────────────────────────────────────────────────

impl<C: ConnectionTrait> DbStore<'_, C> {
    async fn allowed_groups_of(&self, client_id: i32) -> Result<Vec<i32>, AccountServiceError> {
        let rows = oauth_client_groups::Entity::find()
            .filter(oauth_client_groups::Column::ClientId.eq(client_id))
            .order_by_asc(oauth_client_groups::Column::GroupId)
            .all(self.conn)
            .await
            .context("list allowed groups of client")?;
        Ok(rows.into_iter().map(|r| r.group_id).collect())
    }

    async fn with_allowed_groups(
        &self,
        model: Option<oauth_clients::Model>,
    ) -> Result<Option<OAuthClient>, AccountServiceError> {
        match model {
            Some(model) => {
                let group_ids = self.allowed_groups_of(model.id).await?;
                Ok(Some(client_from_model(model, group_ids)))
            }
            None => Ok(None),
        }
    }
}

impl<C: ConnectionTrait> OAuthClientRepository for DbStore<'_, C> {
    async fn find_by_id(&self, id: i32) -> Result<Option<OAuthClient>, AccountServiceError> {
        let model = oauth_clients::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("find oauth client by id")?;
        self.with_allowed_groups(model).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<OAuthClient>, AccountServiceError> {
        let model = oauth_clients::Entity::find()
            .filter(oauth_clients::Column::Name.eq(name))
            .one(self.conn)
            .await
            .context("find oauth client by name")?;
        self.with_allowed_groups(model).await
    }

    async fn list(&self) -> Result<Vec<OAuthClient>, AccountServiceError> {
        let models = oauth_clients::Entity::find()
            .order_by_asc(oauth_clients::Column::Id)
            .all(self.conn)
            .await
            .context("list oauth clients")?;
        let mut allowed: HashMap<i32, Vec<i32>> = HashMap::new();
        for row in oauth_client_groups::Entity::find()
            .order_by_asc(oauth_client_groups::Column::GroupId)
            .all(self.conn)
            .await
            .context("list oauth client groups")?
        {
            allowed.entry(row.client_id).or_default().push(row.group_id);
        }
        Ok(models
            .into_iter()
            .map(|m| {
                let group_ids = allowed.remove(&m.id).unwrap_or_default();
                client_from_model(m, group_ids)
            })
            .collect())
    }

    async fn create(&self, client: &NewClient) -> Result<OAuthClient, AccountServiceError> {
        let now = Utc::now();
        let model = oauth_clients::ActiveModel {
            name: Set(client.name.clone()),
            secret: Set(client.secret.clone()),
            redirect_url: Set(client.redirect_url.clone()),
            home_url: Set(client.home_url.clone()),
            description: Set(client.description.clone()),
            icon: Set(None),
            is_public: Set(false),
            created_at: Set(now),
            modified_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("create oauth client")?;
        Ok(client_from_model(model, Vec::new()))
    }

    async fn update(&self, client: &OAuthClient) -> Result<(), AccountServiceError> {
        oauth_clients::ActiveModel {
            id: Set(client.id),
            name: Set(client.name.clone()),
            secret: Set(client.secret.clone()),
            redirect_url: Set(client.redirect_url.clone()),
            home_url: Set(client.home_url.clone()),
            description: Set(client.description.clone()),
            icon: Set(client.icon.clone()),
            is_public: Set(client.is_public),
            modified_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(self.conn)
        .await
        .context("update oauth client")?;
        Ok(())
    }

    async fn set_allowed_groups(
        &self,
        client_id: i32,
        group_ids: &[i32],
    ) -> Result<(), AccountServiceError> {
        oauth_client_groups::Entity::delete_many()
            .filter(oauth_client_groups::Column::ClientId.eq(client_id))
            .exec(self.conn)
            .await
            .context("clear allowed groups")?;
        if group_ids.is_empty() {
            return Ok(());
        }
        oauth_client_groups::Entity::insert_many(group_ids.iter().map(|&group_id| {
            oauth_client_groups::ActiveModel {
                client_id: Set(client_id),
                group_id: Set(group_id),
            }
        }))
        .exec_without_returning(self.conn)
        .await
        .context("insert allowed groups")?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError> {
        let result = oauth_clients::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("delete oauth client")?;
        Ok(result.rows_affected > 0)
    }
}

fn client_from_model(model: oauth_clients::Model, allowed_group_ids: Vec<i32>) -> OAuthClient {
    OAuthClient {
        id: model.id,
        name: model.name,
        secret: model.secret,
        redirect_url: model.redirect_url,
        home_url: model.home_url,
        description: model.description,
        icon: model.icon,
        is_public: model.is_public,
        allowed_group_ids,
    }
}

// ── OAuth authorization repository ───────────────────────────────────────────

impl<C: ConnectionTrait> OAuthAuthorizationRepository for DbStore<'_, C> {
    async fn find_by_authorize_token(
        &self,
        client_id: i32,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError> {
        let model = oauth_authorizations::Entity::find()
            .filter(oauth_authorizations::Column::ClientId.eq(client_id))
            .filter(oauth_authorizations::Column::AuthorizeToken.eq(token))
            .one(self.conn)
            .await
            .context("find authorization by code")?;
        Ok(model.map(authorization_from_model))
    }

    async fn find_by_access_token(
        &self,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError> {
        let model = oauth_authorizations::Entity::find()
            .filter(oauth_authorizations::Column::AccessToken.eq(token))
            .one(self.conn)
            .await
            .context("find authorization by access token")?;
        Ok(model.map(authorization_from_model))
    }

    async fn authorize_token_exists(&self, token: &str) -> Result<bool, AccountServiceError> {
        let count = oauth_authorizations::Entity::find()
            .filter(oauth_authorizations::Column::AuthorizeToken.eq(token))
            .count(self.conn)
            .await
            .context("check authorize token")?;
        Ok(count > 0)
    }

    async fn access_token_exists(&self, token: &str) -> Result<bool, AccountServiceError> {
        let count = oauth_authorizations::Entity::find()
            .filter(oauth_authorizations::Column::AccessToken.eq(token))
            .count(self.conn)
            .await
            .context("check access token")?;
        Ok(count > 0)
    }

    async fn upsert_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        token: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), AccountServiceError> {
        let now = Utc::now();
        oauth_authorizations::Entity::insert(oauth_authorizations::ActiveModel {
            client_id: Set(client_id),
            user_id: Set(user_id),
            authorize_token: Set(Some(token.to_owned())),
            authorize_token_expire_at: Set(Some(expire_at)),
            access_token: Set(None),
            created_at: Set(now),
            modified_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([
                oauth_authorizations::Column::ClientId,
                oauth_authorizations::Column::UserId,
            ])
            .update_columns([
                oauth_authorizations::Column::AuthorizeToken,
                oauth_authorizations::Column::AuthorizeTokenExpireAt,
                oauth_authorizations::Column::ModifiedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(self.conn)
        .await
        .context("upsert authorize token")?;
        Ok(())
    }

    async fn redeem_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        code: &str,
        access_token: &str,
    ) -> Result<bool, AccountServiceError> {
        let result = oauth_authorizations::Entity::update_many()
            .col_expr(
                oauth_authorizations::Column::AccessToken,
                Expr::value(Some(access_token.to_owned())),
            )
            .col_expr(
                oauth_authorizations::Column::AuthorizeToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                oauth_authorizations::Column::AuthorizeTokenExpireAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(oauth_authorizations::Column::ModifiedAt, Expr::value(Utc::now()))
            .filter(oauth_authorizations::Column::ClientId.eq(client_id))
            .filter(oauth_authorizations::Column::UserId.eq(user_id))
            .filter(oauth_authorizations::Column::AuthorizeToken.eq(code))
            .exec(self.conn)
            .await
            .context("redeem authorize token")?;
        Ok(result.rows_affected == 1)
    }

    async fn clear_user_tokens(&self, user_id: i32) -> Result<u64, AccountServiceError> {
        let result = oauth_authorizations::Entity::update_many()
            .col_expr(
                oauth_authorizations::Column::AuthorizeToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                oauth_authorizations::Column::AuthorizeTokenExpireAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(
                oauth_authorizations::Column::AccessToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(oauth_authorizations::Column::ModifiedAt, Expr::value(Utc::now()))
            .filter(oauth_authorizations::Column::UserId.eq(user_id))
            .exec(self.conn)
            .await
            .context("clear user tokens")?;
        Ok(result.rows_affected)
    }

    async fn user_ids_for_client(&self, client_id: i32) -> Result<Vec<i32>, AccountServiceError> {
        let rows = oauth_authorizations::Entity::find()
            .filter(oauth_authorizations::Column::ClientId.eq(client_id))
            .order_by_asc(oauth_authorizations::Column::UserId)
            .all(self.conn)
            .await
            .context("list users of client")?;
        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }
}

fn authorization_from_model(model: oauth_authorizations::Model) -> OAuthAuthorization {
    OAuthAuthorization {
        client_id: model.client_id,
        user_id: model.user_id,
        authorize_token: model.authorize_token,
        authorize_token_expire_at: model.authorize_token_expire_at,
        access_token: model.access_token,
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

impl<C: ConnectionTrait> OutboxRepository for DbStore<'_, C> {
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), AccountServiceError> {
        let now = Utc::now();
        outbox_events::ActiveModel {
            id: Set(event.id),
            kind: Set(event.kind.clone()),
            payload: Set(event.payload.clone()),
            idempotency_key: Set(event.idempotency_key.clone()),
            attempts: Set(0),
            last_error: Set(None),
            created_at: Set(now),
            next_attempt_at: Set(now),
            processed_at: Set(None),
            failed_at: Set(None),
        }
        .insert(self.conn)
        .await
        .context("enqueue outbox event")?;
        Ok(())
    }
}

// ── Login record repository ──────────────────────────────────────────────────

/// Audit log on the pool itself, so rows survive a rolled-back request.
#[derive(Clone)]
pub struct DbLoginRecordRepository {
    pub db: DatabaseConnection,
}

impl LoginRecordRepository for DbLoginRecordRepository {
    async fn recent_for_user(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginRecord>, AccountServiceError> {
        let models = login_records::Entity::find()
            .filter(login_records::Column::UserId.eq(user_id))
            .filter(login_records::Column::Time.gte(since))
            .order_by_desc(login_records::Column::Time)
            .order_by_desc(login_records::Column::Id)
            .all(&self.db)
            .await
            .context("list recent login records")?;
        Ok(models.into_iter().map(login_record_from_model).collect())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<LoginRecord>, AccountServiceError> {
        let models = login_records::Entity::find()
            .filter(login_records::Column::UserId.eq(user_id))
            .order_by_desc(login_records::Column::Time)
            .order_by_desc(login_records::Column::Id)
            .all(&self.db)
            .await
            .context("list login records")?;
        Ok(models.into_iter().map(login_record_from_model).collect())
    }

    async fn append(&self, record: &LoginRecord) -> Result<(), AccountServiceError> {
        login_records::ActiveModel {
            user_id: Set(record.user_id),
            time: Set(record.time),
            ip: Set(record.ip.clone()),
            user_agent: Set(record.user_agent.clone()),
            success: Set(record.success),
            reason: Set(record.reason.clone()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .context("append login record")?;
        Ok(())
    }
}

fn login_record_from_model(model: login_records::Model) -> LoginRecord {
    LoginRecord {
        user_id: model.user_id,
        time: model.time,
        ip: model.ip,
        user_agent: model.user_agent,
        success: model.success,
        reason: model.reason,
    }
}
