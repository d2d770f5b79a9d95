use serde::Deserialize;

use accord_core::config::Config;

fn default_account_port() -> u16 {
    3110
}

fn default_totp_issuer() -> String {
    "Accord".to_owned()
}

fn default_cookie_secure() -> bool {
    true
}

/// Account service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AccountConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing session cookies.
    pub session_secret: String,
    /// TCP port to listen on (default 3110). Env var: `ACCOUNT_PORT`.
    #[serde(default = "default_account_port")]
    pub account_port: u16,
    /// Issuer label shown by authenticator apps.
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,
    /// JSON array of external auth providers. Empty means none.
    #[serde(default)]
    pub external_auth_providers: String,
    /// Cookie `Domain` attribute; host-only cookies when unset.
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
}

impl Config for AccountConfig {}
