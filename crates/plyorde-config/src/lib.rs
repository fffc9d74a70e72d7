//! Configuration loading, validation and site resolution.
//!
//! The service reads one YAML document describing the HTTP listener, logging,
//! connector timeouts, bulk-operation limits, the managed sites and the API
//! keys allowed to reach them. [`SiteDirectory`] turns that document into the
//! per-request authorization gate used by the HTTP layer.
#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod connector_url;
pub mod defaults;
pub mod directory;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use connector_url::connector_base_url;
pub use directory::{ApiCredential, ResolvedSite, SiteDirectory, hash_secret};
pub use error::{AccessError, ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, ConfigLoader, load_from_env};
pub use model::{
    ApiKeyRecord, AppConfig, ConnectorRecord, ConnectorSettings, LimitSettings, LoggingSettings,
    Permission, ServerConfig, SiteRecord,
};
pub use validate::validate;
