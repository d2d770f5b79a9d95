#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{
    ExternalAuthProviderInfo, Group, LoginRecord, NewClient, NewUser, OAuthAuthorization,
    OAuthClient, OutboxEvent, TokenChannel, User,
};
use crate::error::{AccountServiceError, ExternalAuthError};

/// Repository for user accounts.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AccountServiceError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AccountServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountServiceError>;
    async fn find_by_nickname(&self, nickname: &str)
    -> Result<Option<User>, AccountServiceError>;
    async fn list(&self) -> Result<Vec<User>, AccountServiceError>;

    async fn create(&self, user: &NewUser) -> Result<User, AccountServiceError>;

    /// Persist every mutable column of `user` (sets `modified_at`).
    async fn update(&self, user: &User) -> Result<(), AccountServiceError>;

    /// Delete a user. Returns `true` if deleted, `false` if not found.
    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError>;

    /// Whether any user currently holds `token` on `channel`.
    async fn channel_token_exists(
        &self,
        channel: TokenChannel,
        token: &str,
    ) -> Result<bool, AccountServiceError>;

    /// Store `step` as the last accepted TOTP step if it is newer than the
    /// stored one. Returns `false` when the step is already spent.
    async fn advance_two_factor_step(
        &self,
        user_id: i32,
        step: i64,
    ) -> Result<bool, AccountServiceError>;
}

/// Repository for groups and memberships.
pub trait GroupRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, AccountServiceError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Group>, AccountServiceError>;
    async fn list(&self) -> Result<Vec<Group>, AccountServiceError>;
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, AccountServiceError>;
    /// Persist the profile fields of `group` (its description).
    async fn update(&self, group: &Group) -> Result<(), AccountServiceError>;
    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError>;

    /// Idempotent.
    async fn add_member(&self, group_id: i32, user_id: i32) -> Result<(), AccountServiceError>;
    async fn remove_member(&self, group_id: i32, user_id: i32)
    -> Result<bool, AccountServiceError>;
    async fn groups_of_user(&self, user_id: i32) -> Result<Vec<Group>, AccountServiceError>;

    /// Ids of the group's members, ascending.
    async fn member_ids(&self, group_id: i32) -> Result<Vec<i32>, AccountServiceError>;
}

/// Append-only login audit log.
pub trait LoginRecordRepository: Send + Sync {
    /// Records of `user_id` at or after `since`, newest first.
    async fn recent_for_user(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginRecord>, AccountServiceError>;

    /// Every record of `user_id`, newest first.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<LoginRecord>, AccountServiceError>;

    /// Durable on return, independent of any surrounding request transaction.
    async fn append(&self, record: &LoginRecord) -> Result<(), AccountServiceError>;
}

/// Repository for registered OAuth clients.
pub trait OAuthClientRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<OAuthClient>, AccountServiceError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<OAuthClient>, AccountServiceError>;
    async fn list(&self) -> Result<Vec<OAuthClient>, AccountServiceError>;
    async fn create(&self, client: &NewClient) -> Result<OAuthClient, AccountServiceError>;

    /// Persist profile fields, secret and `is_public`. Allowed groups are
    /// written through [`set_allowed_groups`](Self::set_allowed_groups).
    async fn update(&self, client: &OAuthClient) -> Result<(), AccountServiceError>;
    async fn set_allowed_groups(
        &self,
        client_id: i32,
        group_ids: &[i32],
    ) -> Result<(), AccountServiceError>;
    async fn delete(&self, id: i32) -> Result<bool, AccountServiceError>;
}

/// Repository for per-(client, user) OAuth grant rows.
pub trait OAuthAuthorizationRepository: Send + Sync {
    async fn find_by_authorize_token(
        &self,
        client_id: i32,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError>;
    async fn find_by_access_token(
        &self,
        token: &str,
    ) -> Result<Option<OAuthAuthorization>, AccountServiceError>;
    async fn authorize_token_exists(&self, token: &str) -> Result<bool, AccountServiceError>;
    async fn access_token_exists(&self, token: &str) -> Result<bool, AccountServiceError>;

    /// Insert or overwrite the code of the (client, user) row. The access
    /// token of an existing row is kept.
    async fn upsert_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        token: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), AccountServiceError>;

    /// Swap `code` for `access_token` on the (client, user) row, clearing the
    /// code and its expiry. Conditional on the row still holding `code`;
    /// returns `false` when it no longer does.
    async fn redeem_authorize_token(
        &self,
        client_id: i32,
        user_id: i32,
        code: &str,
        access_token: &str,
    ) -> Result<bool, AccountServiceError>;

    /// Null every token column of the user's rows. Returns rows touched.
    async fn clear_user_tokens(&self, user_id: i32) -> Result<u64, AccountServiceError>;

    async fn user_ids_for_client(&self, client_id: i32) -> Result<Vec<i32>, AccountServiceError>;
}

/// Outgoing mail, written to the outbox in the caller's transaction.
pub trait OutboxRepository: Send + Sync {
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), AccountServiceError>;
}

/// Port to the configured external password verifiers.
pub trait ExternalAuthPort: Send + Sync {
    fn has_provider(&self, provider_id: &str) -> bool;

    fn providers(&self) -> Vec<ExternalAuthProviderInfo>;

    /// `Ok(false)` means the provider rejected the credentials.
    async fn check(
        &self,
        provider_id: &str,
        name: &str,
        password: &str,
    ) -> Result<bool, ExternalAuthError>;
}
