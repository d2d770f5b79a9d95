use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginRecords::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(LoginRecords::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginRecords::Ip).string_len(64))
                    .col(ColumnDef::new(LoginRecords::UserAgent).string_len(128))
                    .col(ColumnDef::new(LoginRecords::Success).boolean().not_null())
                    .col(ColumnDef::new(LoginRecords::Reason).string_len(64))
                    .foreign_key(
                        ForeignKey::create()
                            .from(LoginRecords::Table, LoginRecords::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lockout scans read the newest rows of one user.
        manager
            .create_index(
                Index::create()
                    .table(LoginRecords::Table)
                    .col(LoginRecords::UserId)
                    .col(LoginRecords::Time)
                    .name("idx_login_records_user_id_time")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LoginRecords {
    Table,
    Id,
    UserId,
    Time,
    Ip,
    UserAgent,
    Success,
    Reason,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
