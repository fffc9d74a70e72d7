//! Shared application state and site resolution.

use async_trait::async_trait;
use plyorde_config::{AccessError, ApiCredential, Permission, SiteDirectory};
use plyorde_connector::SiteConnectorContext;
use plyorde_fileman::FileManager;
use plyorde_telemetry::Metrics;
use std::sync::Arc;
use tracing::debug;

use crate::http::errors::ApiError;

/// Resolves a caller and site to the connector context for one operation.
#[async_trait]
pub trait SiteResolver: Send + Sync {
    /// Authorize `credential` for `permission` on `site_id`.
    ///
    /// # Errors
    ///
    /// See [`AccessError`].
    async fn resolve(
        &self,
        credential: &ApiCredential,
        site_id: &str,
        permission: Permission,
    ) -> Result<SiteConnectorContext, AccessError>;
}

#[async_trait]
impl SiteResolver for SiteDirectory {
    async fn resolve(
        &self,
        credential: &ApiCredential,
        site_id: &str,
        permission: Permission,
    ) -> Result<SiteConnectorContext, AccessError> {
        let site = self.authorize(Some(credential), site_id, permission)?;
        Ok(SiteConnectorContext::new(
            site.site_id,
            site.base_url,
            site.token,
        ))
    }
}

/// State handed to every handler.
pub struct ApiState {
    pub(crate) files: FileManager,
    pub(crate) sites: Arc<dyn SiteResolver>,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub fn new(files: FileManager, sites: Arc<dyn SiteResolver>, telemetry: Metrics) -> Self {
        Self {
            files,
            sites,
            telemetry,
        }
    }

    pub(crate) async fn site_context(
        &self,
        credential: &ApiCredential,
        site_id: &str,
        permission: Permission,
    ) -> Result<SiteConnectorContext, ApiError> {
        let ctx = self
            .sites
            .resolve(credential, site_id, permission)
            .await
            .map_err(|err| {
                debug!(
                    key_id = credential.key_id(),
                    site_id,
                    permission = permission.as_str(),
                    error = %err,
                    "site access denied"
                );
                ApiError::from(err)
            })?;
        Ok(ctx)
    }
}
