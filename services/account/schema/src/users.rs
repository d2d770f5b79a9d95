use sea_orm::entity::prelude::*;

/// Account identity record, including every short-lived credential channel.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub nickname: Option<String>,
    /// PHC-formatted password hash.
    pub password: String,
    pub is_active: bool,
    pub is_email_confirmed: bool,
    pub email_confirmed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub email_confirm_token: Option<String>,
    pub email_confirm_token_expire_at: Option<chrono::DateTime<chrono::Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expire_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Raw TOTP secret (20 bytes).
    pub two_factor_key: Option<Vec<u8>>,
    pub is_two_factor_enabled: bool,
    pub two_factor_setup_expire_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Last accepted TOTP step; codes at or below it are spent.
    pub two_factor_last_step: Option<i64>,
    pub two_factor_disable_token: Option<String>,
    pub two_factor_disable_token_expire_at: Option<chrono::DateTime<chrono::Utc>>,
    pub external_auth_provider_id: Option<String>,
    pub external_auth_enforced: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::login_records::Entity")]
    LoginRecords,
    #[sea_orm(has_many = "super::oauth_authorizations::Entity")]
    OAuthAuthorizations,
    #[sea_orm(has_many = "super::user_groups::Entity")]
    UserGroups,
}

impl Related<super::login_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginRecords.def()
    }
}

impl Related<super::oauth_authorizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OAuthAuthorizations.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_groups::Relation::Group.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_groups::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
