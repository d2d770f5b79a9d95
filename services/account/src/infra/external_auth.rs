//! External password verifiers.
//!
//! Providers are configured once at start-up from a JSON array and never
//! change afterwards:
//!
//! ```json
//! [
//!   {"type": "ldap", "id": "corp", "name": "Corp directory",
//!    "url": "ldaps://ldap.corp.example", "users_dn": "ou=people,dc=corp,dc=example"},
//!   {"type": "http", "id": "sso", "name": "SSO", "url": "https://sso.example/verify"}
//! ]
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use ldap3::{LdapConnAsync, LdapConnSettings};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::domain::repository::ExternalAuthPort;
use crate::domain::types::ExternalAuthProviderInfo;
use crate::error::ExternalAuthError;

const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// LDAP result code for a bind with wrong credentials.
const LDAP_INVALID_CREDENTIALS: u32 = 49;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ldap {
        #[serde(flatten)]
        info: ExternalAuthProviderInfo,
        url: String,
        users_dn: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Http {
        #[serde(flatten)]
        info: ExternalAuthProviderInfo,
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderConfig {
    fn info(&self) -> &ExternalAuthProviderInfo {
        match self {
            Self::Ldap { info, .. } | Self::Http { info, .. } => info,
        }
    }
}

// ── Providers ────────────────────────────────────────────────────────────────

/// Simple bind as `uid=<name>,<users_dn>`.
#[derive(Debug)]
pub struct LdapProvider {
    url: String,
    users_dn: String,
    timeout: Duration,
}

impl LdapProvider {
    fn user_dn(&self, name: &str) -> String {
        format!("uid={},{}", ldap3::dn_escape(name), self.users_dn)
    }

    async fn check(&self, name: &str, password: &str) -> Result<bool, ExternalAuthError> {
        // An empty password would be an unauthenticated bind, which succeeds.
        if password.is_empty() {
            return Ok(false);
        }
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(|e| ExternalAuthError::Unreachable(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "ldap connection driver error");
            }
        });

        let result = ldap
            .simple_bind(&self.user_dn(name), password)
            .await
            .map_err(|e| ExternalAuthError::Unreachable(e.to_string()))?;
        let _ = ldap.unbind().await;

        match result.rc {
            0 => Ok(true),
            LDAP_INVALID_CREDENTIALS => Ok(false),
            rc => Err(ExternalAuthError::UnexpectedResponse(format!(
                "ldap bind returned rc={rc}: {}",
                result.text
            ))),
        }
    }
}

/// POSTs `{"username", "password"}` as JSON.
#[derive(Debug)]
pub struct HttpProvider {
    url: String,
    client: reqwest::Client,
}

impl HttpProvider {
    async fn check(&self, name: &str, password: &str) -> Result<bool, ExternalAuthError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "username": name, "password": password }))
            .send()
            .await
            .map_err(|e| ExternalAuthError::Unreachable(e.without_url().to_string()))?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            s => Err(ExternalAuthError::UnexpectedResponse(format!(
                "verifier returned {s}"
            ))),
        }
    }
}

#[derive(Debug)]
enum Provider {
    Ldap(LdapProvider),
    Http(HttpProvider),
}

#[derive(Debug)]
struct Entry {
    info: ExternalAuthProviderInfo,
    provider: Provider,
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Immutable set of configured providers, keyed by id.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Parse the JSON provider list. An empty string yields an empty registry.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let configs: Vec<ProviderConfig> =
            serde_json::from_str(raw).context("parse external auth provider config")?;
        Self::from_configs(configs)
    }

    pub fn from_configs(configs: Vec<ProviderConfig>) -> anyhow::Result<Self> {
        let mut registry = Self::default();
        for config in configs {
            let id = config.info().id.clone();
            if id.is_empty() {
                bail!("external auth provider id must not be empty");
            }
            if registry.entries.contains_key(&id) {
                bail!("duplicate external auth provider id: {id}");
            }
            let info = config.info().clone();
            let provider = match config {
                ProviderConfig::Ldap {
                    url,
                    users_dn,
                    timeout_secs,
                    ..
                } => Provider::Ldap(LdapProvider {
                    url,
                    users_dn,
                    timeout: Duration::from_secs(timeout_secs),
                }),
                ProviderConfig::Http {
                    url, timeout_secs, ..
                } => Provider::Http(HttpProvider {
                    url,
                    client: reqwest::Client::builder()
                        .timeout(Duration::from_secs(timeout_secs))
                        .build()
                        .context("build http verifier client")?,
                }),
            };
            tracing::info!(provider_id = %id, "external auth provider registered");
            registry.order.push(id.clone());
            registry.entries.insert(id, Entry { info, provider });
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExternalAuthPort for ProviderRegistry {
    fn has_provider(&self, provider_id: &str) -> bool {
        self.entries.contains_key(provider_id)
    }

    fn providers(&self) -> Vec<ExternalAuthProviderInfo> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|e| e.info.clone())
            .collect()
    }

    async fn check(
        &self,
        provider_id: &str,
        name: &str,
        password: &str,
    ) -> Result<bool, ExternalAuthError> {
        let entry = self
            .entries
            .get(provider_id)
            .ok_or_else(|| ExternalAuthError::UnknownProvider(provider_id.to_owned()))?;
        let accepted = match &entry.provider {
            Provider::Ldap(p) => p.check(name, password).await,
            Provider::Http(p) => p.check(name, password).await,
        }?;
        tracing::debug!(provider_id, accepted, "external credential check");
        Ok(accepted)
    }
}

impl<T: ExternalAuthPort> ExternalAuthPort for Arc<T> {
    fn has_provider(&self, provider_id: &str) -> bool {
        (**self).has_provider(provider_id)
    }

    fn providers(&self) -> Vec<ExternalAuthProviderInfo> {
        (**self).providers()
    }

    async fn check(
        &self,
        provider_id: &str,
        name: &str,
        password: &str,
    ) -> Result<bool, ExternalAuthError> {
        (**self).check(provider_id, name, password).await
    }
}
