//! Text/binary classification of read responses and the inverse write shape.
//!
//! # Design
//! - The connector's read endpoint answers with raw text, raw bytes, or a
//!   JSON envelope; [`detect`] folds all three into a [`ReadPayload`].
//! - Classification is conservative: anything not positively identified as
//!   text (including text content types carrying invalid UTF-8) travels as
//!   base64 so binary data is never mangled.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const ENCODING_HEADERS: [&str; 3] = [
    "content-transfer-encoding",
    "x-content-encoding",
    "content-encoding",
];
const TEXT_TYPES: [&str; 3] = [
    "application/xml",
    "application/json",
    "application/javascript",
];

/// Content-Type used for text writes.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
/// Content-Type used for base64 writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encoding of a [`ReadPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// UTF-8 text.
    Text,
    /// Base64 of arbitrary bytes.
    Base64,
}

/// File contents in a transport-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPayload {
    /// How `content` is encoded.
    pub kind: PayloadKind,
    /// Text or base64 string.
    pub content: String,
}

impl ReadPayload {
    /// Text payload.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::Text,
            content: content.into(),
        }
    }

    /// Base64 payload wrapping the given bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            kind: PayloadKind::Base64,
            content: STANDARD.encode(bytes),
        }
    }
}

/// Body and content type for a write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Request body.
    pub body: Vec<u8>,
}

/// Classify a read response.
#[must_use]
pub fn detect(body: &[u8], headers: &HeaderMap) -> ReadPayload {
    let content_type = header_text(headers, CONTENT_TYPE.as_str()).to_ascii_lowercase();

    if content_type.contains("application/json")
        && let Ok(Value::Object(parsed)) = serde_json::from_slice::<Value>(body)
        && let Some(Value::String(content)) = parsed.get("content")
    {
        let kind = if declares_base64(&parsed, headers) {
            PayloadKind::Base64
        } else {
            PayloadKind::Text
        };
        return ReadPayload {
            kind,
            content: content.clone(),
        };
    }

    let textual = content_type.starts_with("text/")
        || TEXT_TYPES.iter().any(|ty| content_type.contains(ty));
    if textual && let Ok(text) = std::str::from_utf8(body) {
        return ReadPayload::text(text);
    }

    ReadPayload::from_bytes(body)
}

/// Build the write request that stores `payload` verbatim.
#[must_use]
pub fn build_write_request(payload: &ReadPayload) -> WriteRequest {
    match payload.kind {
        PayloadKind::Text => WriteRequest {
            content_type: TEXT_CONTENT_TYPE,
            body: payload.content.clone().into_bytes(),
        },
        PayloadKind::Base64 => WriteRequest {
            content_type: JSON_CONTENT_TYPE,
            body: json!({ "content": payload.content, "encoding": "base64" })
                .to_string()
                .into_bytes(),
        },
    }
}

fn declares_base64(parsed: &serde_json::Map<String, Value>, headers: &HeaderMap) -> bool {
    let encoding = parsed
        .get("encoding")
        .or_else(|| parsed.get("contentEncoding"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    encoding.eq_ignore_ascii_case("base64")
        || parsed.get("isBase64") == Some(&Value::Bool(true))
        || parsed.get("base64") == Some(&Value::Bool(true))
        || ENCODING_HEADERS.iter().any(|name| {
            header_text(headers, name)
                .to_ascii_lowercase()
                .contains("base64")
        })
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ")
}
