//! Per-request connector coordinates.

use std::fmt;

use url::Url;

/// Site and connector credentials resolved for one request.
///
/// The base URL is taken as given; derivation from stored connector records
/// happens before a context is built.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteConnectorContext {
    site_id: String,
    base_url: Url,
    token: String,
}

impl SiteConnectorContext {
    /// Bundle an already-normalized base URL with the site id and token.
    #[must_use]
    pub fn new(site_id: impl Into<String>, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            base_url,
            token: token.into(),
        }
    }

    /// Site identifier used in connector paths.
    #[must_use]
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Connector base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Bearer token presented to the connector.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SiteConnectorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConnectorContext")
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}
