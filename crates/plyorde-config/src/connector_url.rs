//! Connector base URL derivation from stored site records.

use url::Url;

use crate::defaults::DEFAULT_CONNECTOR_PORT;
use crate::error::{ConfigError, ConfigResult};

/// Turn a stored connector address into the base URL used for API calls.
///
/// Addresses that already carry an `http://` or `https://` scheme are used
/// as-is. Bare host names get `https://` when `ssl_enabled` is set and
/// `http://` otherwise, plus port 8080 unless a port is given. Query,
/// fragment and trailing slashes are dropped.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConnectorUrl`] when the address is empty or
/// cannot be parsed as a URL.
pub fn connector_base_url(fqdn: &str, ssl_enabled: bool) -> ConfigResult<Url> {
    let raw = fqdn.trim();
    if raw.is_empty() {
        return Err(invalid(fqdn, "empty"));
    }

    let has_scheme = has_http_scheme(raw);
    let candidate = if has_scheme {
        raw.to_string()
    } else {
        let scheme = if ssl_enabled { "https" } else { "http" };
        format!("{scheme}://{raw}")
    };

    let mut url = Url::parse(&candidate).map_err(|_| invalid(fqdn, "unparsable"))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid(fqdn, "missing host"));
    }
    if !has_scheme && url.port().is_none() {
        url.set_port(Some(DEFAULT_CONNECTOR_PORT))
            .map_err(|()| invalid(fqdn, "port not allowed"))?;
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn invalid(value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidConnectorUrl {
        value: value.to_string(),
        reason,
    }
}
