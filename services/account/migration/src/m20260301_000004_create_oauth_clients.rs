use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuthClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthClients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthClients::Name)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuthClients::Secret).string().not_null())
                    .col(
                        ColumnDef::new(OAuthClients::RedirectUrl)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OAuthClients::HomeUrl).string_len(128))
                    .col(ColumnDef::new(OAuthClients::Description).string_len(256))
                    .col(ColumnDef::new(OAuthClients::Icon).string_len(128))
                    .col(
                        ColumnDef::new(OAuthClients::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OAuthClients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthClients::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuthClientGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthClientGroups::ClientId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthClientGroups::GroupId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(OAuthClientGroups::ClientId)
                            .col(OAuthClientGroups::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OAuthClientGroups::Table, OAuthClientGroups::ClientId)
                            .to(OAuthClients::Table, OAuthClients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OAuthClientGroups::Table, OAuthClientGroups::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OAuthClientGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuthClients::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OAuthClients {
    #[iden = "oauth_clients"]
    Table,
    Id,
    Name,
    Secret,
    RedirectUrl,
    HomeUrl,
    Description,
    Icon,
    IsPublic,
    CreatedAt,
    ModifiedAt,
}

#[derive(Iden)]
enum OAuthClientGroups {
    #[iden = "oauth_client_groups"]
    Table,
    ClientId,
    GroupId,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
}
