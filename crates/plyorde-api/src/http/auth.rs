//! Credential extraction for the file routes.
//!
//! The middleware only establishes who is calling; each handler then asks
//! the site resolver for the permission its operation needs.

use axum::{
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use plyorde_config::ApiCredential;

use crate::http::constants::HEADER_API_KEY;
use crate::http::errors::ApiError;

/// Require a `key_id:secret` credential and stash it in request extensions.
pub(crate) async fn require_credential(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = extract_api_key(&req)
        .ok_or_else(|| ApiError::unauthorized("missing API key header"))?;
    let credential = ApiCredential::parse(&raw)
        .ok_or_else(|| ApiError::unauthorized("API key must be provided as key_id:secret"))?;
    req.extensions_mut().insert(credential);
    Ok(next.run(req).await)
}

/// Read the key from `x-api-key` or an `Authorization: Bearer` header.
pub(crate) fn extract_api_key<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();
    if let Some(value) = headers
        .get(HEADER_API_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Some(value.to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
