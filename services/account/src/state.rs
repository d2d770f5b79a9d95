use std::sync::Arc;

use sea_orm::DatabaseConnection;

use accord_session::cookie::CookieSettings;

use crate::infra::db::{DbLoginRecordRepository, DbStore};
use crate::infra::external_auth::ProviderRegistry;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub providers: Arc<ProviderRegistry>,
    pub session_secret: String,
    pub totp_issuer: String,
    pub cookies: CookieSettings,
}

impl AppState {
    /// Autocommit store for read-only requests.
    pub fn store(&self) -> DbStore<'_, DatabaseConnection> {
        DbStore::new(&self.db)
    }

    pub fn login_record_repo(&self) -> DbLoginRecordRepository {
        DbLoginRecordRepository {
            db: self.db.clone(),
        }
    }
}
