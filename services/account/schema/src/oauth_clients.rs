use sea_orm::entity::prelude::*;

/// Registered relying-party application.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub secret: String,
    pub redirect_url: String,
    pub home_url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::oauth_authorizations::Entity")]
    OAuthAuthorizations,
    #[sea_orm(has_many = "super::oauth_client_groups::Entity")]
    OAuthClientGroups,
}

impl Related<super::oauth_authorizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OAuthAuthorizations.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        super::oauth_client_groups::Relation::Group.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::oauth_client_groups::Relation::Client.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
