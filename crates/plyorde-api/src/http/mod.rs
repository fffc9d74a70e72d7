//! HTTP surface modules.

/// Credential extraction middleware.
pub mod auth;
/// Shared header names and problem URIs.
pub mod constants;
/// Problem responses and extractor rejections.
pub mod errors;
/// File-manager routes.
pub mod files;
/// Health and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
