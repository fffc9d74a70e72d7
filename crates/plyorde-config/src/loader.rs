//! Configuration loading from a YAML file plus environment overrides.
//!
//! # Design
//! - The file path comes from `PLYORDE_CONFIG`; without it the default path
//!   is optional and a missing file yields the built-in defaults.
//! - Environment values are passed in explicitly so loading stays pure and
//!   testable; [`load_from_env`] wires the process environment.
//! - The merged document is validated before it is returned.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;
use crate::validate::validate;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "PLYORDE_CONFIG";
/// Environment variable overriding `server.bind_addr`.
pub const BIND_ADDR_ENV: &str = "PLYORDE_BIND_ADDR";
/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "PLYORDE_LOG_LEVEL";
/// Environment variable overriding `logging.format`.
pub const LOG_FORMAT_ENV: &str = "PLYORDE_LOG_FORMAT";
/// Configuration path used when `PLYORDE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/plyorde.yaml";

/// Builder that resolves the configuration document.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    required: bool,
    env: HashMap<String, String>,
}

impl ConfigLoader {
    /// Load from an explicit path; the file must exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
            env: HashMap::new(),
        }
    }

    /// Derive the loader from environment variables.
    #[must_use]
    pub fn from_env_vars(env: impl IntoIterator<Item = (String, String)>) -> Self {
        let env: HashMap<String, String> = env.into_iter().collect();
        let (path, required) = env.get(CONFIG_PATH_ENV).map_or_else(
            || (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            |value| (PathBuf::from(value), true),
        );
        Self {
            path,
            required,
            env,
        }
    }

    /// Path the loader reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, merge overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an override is
    /// malformed, or validation fails.
    pub fn load(&self) -> ConfigResult<AppConfig> {
        let mut config = match fs::read_to_string(&self.path) {
            Ok(raw) => parse_document(&self.path, &raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !self.required => {
                warn!(
                    path = %self.path.display(),
                    "configuration file not found; using built-in defaults"
                );
                AppConfig::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        self.apply_overrides(&mut config)?;
        validate(&config)?;
        info!(
            path = %self.path.display(),
            sites = config.sites.len(),
            api_keys = config.api_keys.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) -> ConfigResult<()> {
        if let Some(value) = self.env.get(BIND_ADDR_ENV) {
            config.server.bind_addr =
                value
                    .trim()
                    .parse::<SocketAddr>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: BIND_ADDR_ENV,
                        value: value.clone(),
                        reason: "expected host:port socket address",
                    })?;
        }
        if let Some(value) = self.env.get(LOG_LEVEL_ENV) {
            config.logging.level = value.trim().to_string();
        }
        if let Some(value) = self.env.get(LOG_FORMAT_ENV) {
            let format = value.trim().to_ascii_lowercase();
            if format != "json" && format != "pretty" {
                return Err(ConfigError::InvalidEnv {
                    name: LOG_FORMAT_ENV,
                    value: value.clone(),
                    reason: "expected json or pretty",
                });
            }
            config.logging.format = Some(format);
        }
        Ok(())
    }
}

/// Load configuration using the process environment.
///
/// # Errors
///
/// See [`ConfigLoader::load`].
pub fn load_from_env() -> ConfigResult<AppConfig> {
    ConfigLoader::from_env_vars(std::env::vars()).load()
}

fn parse_document(path: &Path, raw: &str) -> ConfigResult<AppConfig> {
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
