use sea_orm::entity::prelude::*;

/// Named authorization bucket. Users join groups; non-public OAuth clients
/// admit only members of their allowed groups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_groups::Entity")]
    UserGroups,
    #[sea_orm(has_many = "super::oauth_client_groups::Entity")]
    OAuthClientGroups,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_groups::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_groups::Relation::Group.def().rev())
    }
}

impl Related<super::oauth_clients::Entity> for Entity {
    fn to() -> RelationDef {
        super::oauth_client_groups::Relation::Client.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::oauth_client_groups::Relation::Group.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
