use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use accord_account::config::AccountConfig;
use accord_account::infra::external_auth::ProviderRegistry;
use accord_account::router::build_router;
use accord_account::state::AppState;
use accord_core::config::Config as _;
use accord_core::tracing::init_tracing;
use accord_session::cookie::CookieSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AccountConfig::from_env().context("load account config")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let providers = ProviderRegistry::from_json(&config.external_auth_providers)?;
    info!(providers = providers.len(), "external auth providers loaded");

    let state = AppState {
        db,
        providers: Arc::new(providers),
        session_secret: config.session_secret,
        totp_issuer: config.totp_issuer,
        cookies: CookieSettings {
            domain: config.cookie_domain,
            secure: config.cookie_secure,
        },
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.account_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("account service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
