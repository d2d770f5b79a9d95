pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_groups;
mod m20260301_000003_create_login_records;
mod m20260301_000004_create_oauth_clients;
mod m20260301_000005_create_oauth_authorizations;
mod m20260301_000006_create_outbox_events;
mod m20260415_000007_add_two_factor_last_step;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_groups::Migration),
            Box::new(m20260301_000003_create_login_records::Migration),
            Box::new(m20260301_000004_create_oauth_clients::Migration),
            Box::new(m20260301_000005_create_oauth_authorizations::Migration),
            Box::new(m20260301_000006_create_outbox_events::Migration),
            Box::new(m20260415_000007_add_two_factor_last_step::Migration),
        ]
    }
}
