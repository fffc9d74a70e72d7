//! Structural validation of a loaded configuration document.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use argon2::password_hash::PasswordHash;

use crate::defaults::{MAX_COPY_CONCURRENCY, MAX_COPY_RENAME_ATTEMPTS};
use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

const CONCURRENCY_RANGE: RangeInclusive<usize> = 1..=MAX_COPY_CONCURRENCY;
const RENAME_ATTEMPTS_RANGE: RangeInclusive<u32> = 1..=MAX_COPY_RENAME_ATTEMPTS;

/// Validate limits, site records and API keys.
///
/// Connector addresses are not resolved here; an unusable connector surfaces
/// as a per-request `NotFound` so one bad site does not block start-up.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate(config: &AppConfig) -> ConfigResult<()> {
    validate_connector(config)?;
    validate_limits(config)?;
    validate_sites(config)?;
    validate_api_keys(config)
}

fn validate_connector(config: &AppConfig) -> ConfigResult<()> {
    if config.connector.metadata_timeout_secs == 0 {
        return Err(ConfigError::invalid_field(
            "connector",
            "metadata_timeout_secs",
            Some("0".into()),
            "must be positive",
        ));
    }
    if config.connector.archive_timeout_secs == 0 {
        return Err(ConfigError::invalid_field(
            "connector",
            "archive_timeout_secs",
            Some("0".into()),
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_limits(config: &AppConfig) -> ConfigResult<()> {
    let limits = &config.limits;
    for (field, value) in [
        ("copy_concurrency", limits.copy_concurrency),
        ("upload_concurrency", limits.upload_concurrency),
    ] {
        if !CONCURRENCY_RANGE.contains(&value) {
            return Err(ConfigError::invalid_field(
                "limits",
                field,
                Some(value.to_string()),
                "must be between 1 and 16",
            ));
        }
    }
    for (field, value) in [
        ("copy_max_rename_attempts", limits.copy_max_rename_attempts),
        ("upload_max_rename_attempts", limits.upload_max_rename_attempts),
    ] {
        if !RENAME_ATTEMPTS_RANGE.contains(&value) {
            return Err(ConfigError::invalid_field(
                "limits",
                field,
                Some(value.to_string()),
                "must be between 1 and 200",
            ));
        }
    }
    if limits.delete_chunk_size == 0 {
        return Err(ConfigError::invalid_field(
            "limits",
            "delete_chunk_size",
            Some("0".into()),
            "must be positive",
        ));
    }
    if limits.archive_max_entries == 0 {
        return Err(ConfigError::invalid_field(
            "limits",
            "archive_max_entries",
            Some("0".into()),
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_sites(config: &AppConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for site in &config.sites {
        if site.id.trim().is_empty() {
            return Err(ConfigError::invalid_field(
                "sites",
                "id",
                None,
                "must not be empty",
            ));
        }
        if site.id.contains('/') {
            return Err(ConfigError::invalid_field(
                "sites",
                "id",
                Some(site.id.clone()),
                "must not contain '/'",
            ));
        }
        if !seen.insert(site.id.as_str()) {
            return Err(ConfigError::invalid_field(
                "sites",
                "id",
                Some(site.id.clone()),
                "duplicate site id",
            ));
        }
    }
    Ok(())
}

fn validate_api_keys(config: &AppConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for key in &config.api_keys {
        if key.key_id.trim().is_empty() || key.key_id.contains(':') {
            return Err(ConfigError::invalid_field(
                "api_keys",
                "key_id",
                Some(key.key_id.clone()),
                "must be non-empty and must not contain ':'",
            ));
        }
        if !seen.insert(key.key_id.as_str()) {
            return Err(ConfigError::invalid_field(
                "api_keys",
                "key_id",
                Some(key.key_id.clone()),
                "duplicate key id",
            ));
        }
        if PasswordHash::new(&key.secret_hash).is_err() {
            return Err(ConfigError::invalid_field(
                "api_keys",
                format!("{}.secret_hash", key.key_id),
                None,
                "must be an argon2 PHC string",
            ));
        }
    }
    Ok(())
}
