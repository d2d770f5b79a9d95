use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuthAuthorizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthAuthorizations::ClientId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizations::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OAuthAuthorizations::AuthorizeToken).string())
                    .col(
                        ColumnDef::new(OAuthAuthorizations::AuthorizeTokenExpireAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(OAuthAuthorizations::AccessToken).string())
                    .col(
                        ColumnDef::new(OAuthAuthorizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizations::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(OAuthAuthorizations::ClientId)
                            .col(OAuthAuthorizations::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OAuthAuthorizations::Table, OAuthAuthorizations::ClientId)
                            .to(OAuthClients::Table, OAuthClients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OAuthAuthorizations::Table, OAuthAuthorizations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // NULLs are distinct in a unique index, so cleared tokens never collide.
        manager
            .create_index(
                Index::create()
                    .table(OAuthAuthorizations::Table)
                    .col(OAuthAuthorizations::AuthorizeToken)
                    .unique()
                    .name("uq_oauth_authorizations_authorize_token")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OAuthAuthorizations::Table)
                    .col(OAuthAuthorizations::AccessToken)
                    .unique()
                    .name("uq_oauth_authorizations_access_token")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OAuthAuthorizations::Table)
                    .col(OAuthAuthorizations::UserId)
                    .name("idx_oauth_authorizations_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OAuthAuthorizations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OAuthAuthorizations {
    #[iden = "oauth_authorizations"]
    Table,
    ClientId,
    UserId,
    AuthorizeToken,
    AuthorizeTokenExpireAt,
    AccessToken,
    CreatedAt,
    ModifiedAt,
}

#[derive(Iden)]
enum OAuthClients {
    #[iden = "oauth_clients"]
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
