use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Name)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Nickname).string_len(16).unique_key())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::IsEmailConfirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::EmailConfirmedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::EmailConfirmToken).string().unique_key())
                    .col(ColumnDef::new(Users::EmailConfirmTokenExpireAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::PasswordResetToken).string().unique_key())
                    .col(
                        ColumnDef::new(Users::PasswordResetTokenExpireAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Users::TwoFactorKey).binary())
                    .col(
                        ColumnDef::new(Users::IsTwoFactorEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::TwoFactorSetupExpireAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::TwoFactorDisableToken).string().unique_key())
                    .col(
                        ColumnDef::new(Users::TwoFactorDisableTokenExpireAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Users::ExternalAuthProviderId).string_len(32))
                    .col(
                        ColumnDef::new(Users::ExternalAuthEnforced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Nickname,
    Password,
    IsActive,
    IsEmailConfirmed,
    EmailConfirmedAt,
    EmailConfirmToken,
    EmailConfirmTokenExpireAt,
    PasswordResetToken,
    PasswordResetTokenExpireAt,
    TwoFactorKey,
    IsTwoFactorEnabled,
    TwoFactorSetupExpireAt,
    TwoFactorDisableToken,
    TwoFactorDisableTokenExpireAt,
    ExternalAuthProviderId,
    ExternalAuthEnforced,
    CreatedAt,
    ModifiedAt,
}
