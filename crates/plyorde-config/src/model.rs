//! Configuration document model.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ARCHIVE_MAX_ENTRIES, DEFAULT_ARCHIVE_TIMEOUT_SECS, DEFAULT_BIND_PORT,
    DEFAULT_COPY_CONCURRENCY, DEFAULT_COPY_RENAME_ATTEMPTS, DEFAULT_DELETE_CHUNK_SIZE,
    DEFAULT_DELETE_PAUSE_MS, DEFAULT_LOG_LEVEL, DEFAULT_METADATA_TIMEOUT_SECS,
    DEFAULT_UPLOAD_CONCURRENCY, DEFAULT_UPLOAD_RENAME_ATTEMPTS,
};

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Timeouts applied to connector calls.
    pub connector: ConnectorSettings,
    /// Bulk operation limits.
    pub limits: LimitSettings,
    /// Managed sites and their connectors.
    pub sites: Vec<SiteRecord>,
    /// API keys allowed to call the file manager.
    pub api_keys: Vec<ApiKeyRecord>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the API binds to.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BIND_PORT)),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level directive passed to the env filter.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Timeouts applied to connector calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectorSettings {
    /// Seconds allowed for list/read/write/mkdir/move/delete.
    pub metadata_timeout_secs: u64,
    /// Seconds allowed for compress/decompress.
    pub archive_timeout_secs: u64,
}

impl ConnectorSettings {
    /// Timeout for metadata and text operations.
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Timeout for archive operations.
    #[must_use]
    pub const fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs)
    }
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            metadata_timeout_secs: DEFAULT_METADATA_TIMEOUT_SECS,
            archive_timeout_secs: DEFAULT_ARCHIVE_TIMEOUT_SECS,
        }
    }
}

/// Limits applied by the bulk operation orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitSettings {
    /// Default worker count for bulk copy.
    pub copy_concurrency: usize,
    /// Default rename attempts for bulk copy.
    pub copy_max_rename_attempts: u32,
    /// Worker count for multi-file uploads.
    pub upload_concurrency: usize,
    /// Rename attempts per uploaded file.
    pub upload_max_rename_attempts: u32,
    /// Items deleted concurrently per chunk.
    pub delete_chunk_size: usize,
    /// Pause between delete chunks.
    pub delete_pause_ms: u64,
    /// Maximum paths per zip download.
    pub archive_max_entries: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            copy_concurrency: DEFAULT_COPY_CONCURRENCY,
            copy_max_rename_attempts: DEFAULT_COPY_RENAME_ATTEMPTS,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            upload_max_rename_attempts: DEFAULT_UPLOAD_RENAME_ATTEMPTS,
            delete_chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            delete_pause_ms: DEFAULT_DELETE_PAUSE_MS,
            archive_max_entries: DEFAULT_ARCHIVE_MAX_ENTRIES,
        }
    }
}

/// One managed site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteRecord {
    /// Identifier used in API routes and connector paths.
    pub id: String,
    /// Owning organization, matched against organization-scoped keys.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Connector hosting the site; sites without one cannot be browsed.
    #[serde(default)]
    pub connector: Option<ConnectorRecord>,
}

/// Connector daemon record for a site.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorRecord {
    /// Host name or URL of the connector.
    pub fqdn: String,
    /// Bearer token presented to the connector.
    pub token: String,
    /// Whether the connector listens with TLS when `fqdn` has no scheme.
    #[serde(default)]
    pub ssl_enabled: bool,
}

impl fmt::Debug for ConnectorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRecord")
            .field("fqdn", &self.fqdn)
            .field("token", &"<redacted>")
            .field("ssl_enabled", &self.ssl_enabled)
            .finish()
    }
}

/// API key allowed to call the file manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyRecord {
    /// Public identifier, the part before `:` in the presented credential.
    pub key_id: String,
    /// Argon2 PHC string of the secret.
    pub secret_hash: String,
    /// Organization the key belongs to; such keys only reach that
    /// organization's sites.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Sites the key may reach; `*` grants all.
    #[serde(default)]
    pub allowed_site_ids: Vec<String>,
    /// File-manager permissions granted to the key.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// File-manager permission checked per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// List directories and read files.
    Read,
    /// Write files and create files or folders.
    Write,
    /// Rename a single entry.
    Rename,
    /// Move entries between directories.
    Move,
    /// Copy entries.
    Copy,
    /// Delete entries.
    Delete,
    /// Upload files.
    Upload,
    /// Download files or zip bundles.
    Download,
    /// Create archives on the connector.
    Archive,
    /// Extract archives on the connector.
    Extract,
}

impl Permission {
    /// Name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Rename => "rename",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Archive => "archive",
            Self::Extract => "extract",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
