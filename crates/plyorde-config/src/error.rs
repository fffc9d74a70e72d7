//! Error types for configuration and site resolution.

use std::io;
use std::path::PathBuf;

use argon2::password_hash::Error as PasswordHashError;
use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configuration file was not valid YAML for the expected shape.
    #[error("failed to parse configuration file")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// An environment override could not be applied.
    #[error("invalid environment override")]
    InvalidEnv {
        /// Environment variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Failed to hash secret material.
    #[error("failed to hash secret material")]
    SecretHashFailed {
        /// Hashing error detail.
        detail: PasswordHashError,
    },
    /// A connector address could not be turned into a base URL.
    #[error("invalid connector address")]
    InvalidConnectorUrl {
        /// Address as stored in the site record.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(
        section: &'static str,
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field: field.into(),
            value,
            reason,
        }
    }
}

/// Authorization and site-resolution failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No credential, an unknown key, or a wrong secret.
    #[error("missing or invalid API credentials")]
    Unauthorized,
    /// The key is valid but may not perform this operation on this site.
    #[error("API key may not access this site")]
    Forbidden {
        /// Site the caller asked for.
        site_id: String,
    },
    /// The site is unknown or its connector record is unusable.
    #[error("site or connector not found")]
    NotFound {
        /// Site the caller asked for.
        site_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn config_error_messages_are_constant() {
        let err = ConfigError::invalid_field("limits", "copy_concurrency", Some("0".into()), "range");
        assert_eq!(err.to_string(), "invalid configuration field");

        let err = ConfigError::Read {
            path: PathBuf::from("missing.yaml"),
            source: io::Error::other("gone"),
        };
        assert_eq!(err.to_string(), "failed to read configuration file");
        assert!(err.source().is_some());
    }

    #[test]
    fn access_error_messages() {
        assert_eq!(
            AccessError::Unauthorized.to_string(),
            "missing or invalid API credentials"
        );
        assert_eq!(
            AccessError::NotFound {
                site_id: "s1".into()
            }
            .to_string(),
            "site or connector not found"
        );
    }
}
