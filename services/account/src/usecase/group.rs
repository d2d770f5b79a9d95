use crate::domain::repository::{GroupRepository, UserRepository};
use crate::domain::types::{Group, GroupProfileUpdate, User};
use crate::domain::validate::{validate_description, validate_group_name};
use crate::error::AccountServiceError;

// ── CreateGroup ──────────────────────────────────────────────────────────────

pub struct CreateGroupInput {
    pub name: String,
    pub description: Option<String>,
}

pub struct CreateGroupUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> CreateGroupUseCase<G> {
    pub async fn execute(&self, input: CreateGroupInput) -> Result<Group, AccountServiceError> {
        if !validate_group_name(&input.name) {
            return Err(AccountServiceError::InvalidGroupName);
        }
        if input
            .description
            .as_deref()
            .is_some_and(|d| !validate_description(d))
        {
            return Err(AccountServiceError::InvalidDescription);
        }
        if self.groups.find_by_name(&input.name).await?.is_some() {
            return Err(AccountServiceError::DuplicateGroupName);
        }
        let group = self
            .groups
            .create(&input.name, input.description.as_deref())
            .await?;
        tracing::info!(group_id = group.id, name = %group.name, "group created");
        Ok(group)
    }
}

// ── GetGroup / UpdateGroup ───────────────────────────────────────────────────

async fn load_group<G: GroupRepository>(
    groups: &G,
    group_id: i32,
) -> Result<Group, AccountServiceError> {
    groups
        .find_by_id(group_id)
        .await?
        .ok_or(AccountServiceError::GroupNotFound)
}

pub struct GetGroupUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> GetGroupUseCase<G> {
    pub async fn execute(&self, group_id: i32) -> Result<Group, AccountServiceError> {
        load_group(&self.groups, group_id).await
    }
}

/// The name is the group's identity in guards and stays fixed.
pub struct UpdateGroupUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> UpdateGroupUseCase<G> {
    pub async fn execute(
        &self,
        group_id: i32,
        update: GroupProfileUpdate,
    ) -> Result<Group, AccountServiceError> {
        if update.is_empty() {
            return Err(AccountServiceError::MissingData);
        }
        let mut group = load_group(&self.groups, group_id).await?;
        if let Some(description) = update.description {
            if description.as_deref().is_some_and(|d| !validate_description(d)) {
                return Err(AccountServiceError::InvalidDescription);
            }
            group.description = description;
        }
        self.groups.update(&group).await?;
        tracing::info!(group_id, "group updated");
        Ok(group)
    }
}

// ── DeleteGroup ──────────────────────────────────────────────────────────────

pub struct DeleteGroupUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> DeleteGroupUseCase<G> {
    pub async fn execute(&self, group_id: i32) -> Result<(), AccountServiceError> {
        if !self.groups.delete(group_id).await? {
            return Err(AccountServiceError::GroupNotFound);
        }
        tracing::info!(group_id, "group deleted");
        Ok(())
    }
}

// ── ListGroups ───────────────────────────────────────────────────────────────

pub struct ListGroupsUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> ListGroupsUseCase<G> {
    pub async fn execute(&self) -> Result<Vec<Group>, AccountServiceError> {
        self.groups.list().await
    }
}

// ── Membership ───────────────────────────────────────────────────────────────

pub struct AddMemberUseCase<G: GroupRepository, U: UserRepository> {
    pub groups: G,
    pub users: U,
}

impl<G: GroupRepository, U: UserRepository> AddMemberUseCase<G, U> {
    pub async fn execute(&self, group_id: i32, user_id: i32) -> Result<(), AccountServiceError> {
        if self.groups.find_by_id(group_id).await?.is_none() {
            return Err(AccountServiceError::GroupNotFound);
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AccountServiceError::UserNotFound);
        }
        self.groups.add_member(group_id, user_id).await?;
        tracing::info!(group_id, user_id, "group member added");
        Ok(())
    }
}

pub struct RemoveMemberUseCase<G: GroupRepository> {
    pub groups: G,
}

impl<G: GroupRepository> RemoveMemberUseCase<G> {
    pub async fn execute(&self, group_id: i32, user_id: i32) -> Result<(), AccountServiceError> {
        if self.groups.find_by_id(group_id).await?.is_none() {
            return Err(AccountServiceError::GroupNotFound);
        }
        if !self.groups.remove_member(group_id, user_id).await? {
            return Err(AccountServiceError::UserNotFound);
        }
        tracing::info!(group_id, user_id, "group member removed");
        Ok(())
    }
}

pub struct ListUserGroupsUseCase<G: GroupRepository, U: UserRepository> {
    pub groups: G,
    pub users: U,
}

impl<G: GroupRepository, U: UserRepository> ListUserGroupsUseCase<G, U> {
    pub async fn execute(&self, user_id: i32) -> Result<Vec<Group>, AccountServiceError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AccountServiceError::UserNotFound);
        }
        self.groups.groups_of_user(user_id).await
    }
}

pub struct ListGroupMembersUseCase<G: GroupRepository, U: UserRepository> {
    pub groups: G,
    pub users: U,
}

impl<G: GroupRepository, U: UserRepository> ListGroupMembersUseCase<G, U> {
    pub async fn execute(&self, group_id: i32) -> Result<Vec<User>, AccountServiceError> {
        load_group(&self.groups, group_id).await?;
        let mut members = Vec::new();
        for user_id in self.groups.member_ids(group_id).await? {
            if let Some(user) = self.users.find_by_id(user_id).await? {
                members.push(user);
            }
        }
        Ok(members)
    }
}
