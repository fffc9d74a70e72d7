//! Normalized connector failures.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result alias for connector calls.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Failure talking to a remote connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector answered with a non-2xx status.
    #[error("connector rejected the request")]
    Status {
        /// Operation that was attempted.
        operation: &'static str,
        /// HTTP status returned by the connector.
        status: u16,
        /// Message extracted from the response body or the status text.
        message: String,
    },
    /// The connector could not be reached, timed out, or broke the stream.
    #[error("connector unreachable")]
    Unreachable {
        /// Operation that was attempted.
        operation: &'static str,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The outgoing request could not be assembled.
    #[error("failed to build connector request")]
    Request {
        /// Operation that was attempted.
        operation: &'static str,
        /// Underlying builder error.
        source: reqwest::Error,
    },
    /// The base URL cannot carry path segments.
    #[error("invalid connector url")]
    InvalidUrl {
        /// Operation that was attempted.
        operation: &'static str,
        /// Offending base URL.
        base_url: String,
    },
    /// A 2xx response body did not have the expected shape.
    #[error("failed to decode connector response")]
    Decode {
        /// Operation that was attempted.
        operation: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl ConnectorError {
    /// Build a status error from a response body.
    #[must_use]
    pub fn from_response(operation: &'static str, status: StatusCode, body: &[u8]) -> Self {
        Self::Status {
            operation,
            status: status.as_u16(),
            message: extract_message(status, body),
        }
    }

    /// Operation the error belongs to.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Status { operation, .. }
            | Self::Unreachable { operation, .. }
            | Self::Request { operation, .. }
            | Self::InvalidUrl { operation, .. }
            | Self::Decode { operation, .. } => operation,
        }
    }

    /// Remote HTTP status, when the connector answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable description recorded in batch results.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Unreachable { source, .. } => {
                if source.is_timeout() {
                    "connector request timed out".to_string()
                } else {
                    format!("connector unreachable: {source}")
                }
            }
            Self::Request { source, .. } => format!("invalid connector request: {source}"),
            Self::InvalidUrl { base_url, .. } => format!("invalid connector url: {base_url}"),
            Self::Decode { source, .. } => format!("unexpected connector response: {source}"),
        }
    }

    /// Whether the failure means the destination name is already taken.
    ///
    /// A 409, a 500 mentioning `file exists`, or any message mentioning
    /// `already exists` counts as a collision.
    #[must_use]
    pub fn is_name_collision(&self) -> bool {
        let Self::Status {
            status, message, ..
        } = self
        else {
            return false;
        };
        let message = message.to_ascii_lowercase();
        *status == StatusCode::CONFLICT.as_u16()
            || (*status == StatusCode::INTERNAL_SERVER_ERROR.as_u16()
                && message.contains("file exists"))
            || message.contains("already exists")
    }
}

/// Pull the most specific message out of an error body.
///
/// Looks for a JSON `error` then `message` string, then a bare JSON string,
/// and falls back to the canonical status text.
#[must_use]
pub fn extract_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        let field = ["error", "message"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .or_else(|| value.as_str())
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = field {
            return text.to_string();
        }
    }
    status.canonical_reason().map_or_else(
        || format!("request failed with status {}", status.as_u16()),
        str::to_string,
    )
}
