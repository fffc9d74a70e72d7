//! Site directory: API-key authentication and site resolution.
//!
//! # Design
//! - Built once from a validated [`AppConfig`]; lookups are read-only.
//! - Resolution is all-or-nothing: callers either get a complete
//!   [`ResolvedSite`] or an [`AccessError`].
//! - Failure ordering: credential, permission, site existence, site scope,
//!   connector record.

use std::collections::HashMap;
use std::fmt;

use argon2::Argon2;
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use tracing::warn;
use url::Url;

use crate::connector_url::connector_base_url;
use crate::defaults::ALL_SITES;
use crate::error::{AccessError, ConfigError, ConfigResult};
use crate::model::{ApiKeyRecord, AppConfig, Permission, SiteRecord};

/// Credential presented by a caller as `key_id:secret`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    key_id: String,
    secret: String,
}

impl ApiCredential {
    /// Parse a `key_id:secret` pair. Returns `None` when either half is empty.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (key_id, secret) = raw.trim().split_once(':')?;
        if key_id.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self {
            key_id: key_id.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Public key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Connector coordinates of a site the caller is allowed to reach.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    /// Site identifier.
    pub site_id: String,
    /// Normalized connector base URL.
    pub base_url: Url,
    /// Bearer token for the connector.
    pub token: String,
}

impl fmt::Debug for ResolvedSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSite")
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Read-only index of sites and API keys.
#[derive(Debug, Clone, Default)]
pub struct SiteDirectory {
    sites: HashMap<String, SiteRecord>,
    keys: HashMap<String, ApiKeyRecord>,
}

impl SiteDirectory {
    /// Index the sites and keys of a configuration document.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sites: config
                .sites
                .iter()
                .map(|site| (site.id.clone(), site.clone()))
                .collect(),
            keys: config
                .api_keys
                .iter()
                .map(|key| (key.key_id.clone(), key.clone()))
                .collect(),
        }
    }

    /// Number of configured sites.
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Authenticate the credential and resolve the site it wants to reach.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unauthorized`] when the credential is missing, the key
    ///   is unknown, or the secret does not match.
    /// - [`AccessError::Forbidden`] when the key lacks `permission` or may not
    ///   reach the site.
    /// - [`AccessError::NotFound`] when the site is unknown or its connector
    ///   record is missing or unusable.
    pub fn authorize(
        &self,
        credential: Option<&ApiCredential>,
        site_id: &str,
        permission: Permission,
    ) -> Result<ResolvedSite, AccessError> {
        let credential = credential.ok_or(AccessError::Unauthorized)?;
        let key = self
            .keys
            .get(credential.key_id())
            .ok_or(AccessError::Unauthorized)?;
        if !secret_matches(&key.secret_hash, &credential.secret) {
            return Err(AccessError::Unauthorized);
        }

        let forbidden = || AccessError::Forbidden {
            site_id: site_id.to_string(),
        };
        let not_found = || AccessError::NotFound {
            site_id: site_id.to_string(),
        };

        if !key.permissions.contains(&permission) {
            return Err(forbidden());
        }
        let site = self.sites.get(site_id).ok_or_else(not_found)?;
        if !key_reaches_site(key, site) {
            return Err(forbidden());
        }

        let connector = site.connector.as_ref().ok_or_else(not_found)?;
        if connector.token.trim().is_empty() {
            warn!(site_id, "connector record has no token");
            return Err(not_found());
        }
        let base_url = connector_base_url(&connector.fqdn, connector.ssl_enabled).map_err(|err| {
            warn!(site_id, error = %err, "connector record has an unusable address");
            not_found()
        })?;

        Ok(ResolvedSite {
            site_id: site.id.clone(),
            base_url,
            token: connector.token.clone(),
        })
    }
}

fn key_reaches_site(key: &ApiKeyRecord, site: &SiteRecord) -> bool {
    if let Some(org) = key.organization_id.as_deref()
        && site.organization_id.as_deref() != Some(org)
    {
        return false;
    }
    key.allowed_site_ids
        .iter()
        .any(|allowed| allowed == ALL_SITES || *allowed == site.id)
}

fn secret_matches(expected_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(expected_hash) else {
        warn!("stored API key hash is not a valid PHC string");
        return false;
    };
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => true,
        Err(PasswordHashError::Password) => false,
        Err(err) => {
            warn!(error = %err, "failed to verify API key secret");
            false
        }
    }
}

/// Hash an API key secret into the PHC string stored in configuration.
///
/// # Errors
///
/// Returns [`ConfigError::SecretHashFailed`] if Argon2 rejects the input.
pub fn hash_secret(secret: &str) -> ConfigResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|detail| ConfigError::SecretHashFailed { detail })
}
