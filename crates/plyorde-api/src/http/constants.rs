//! Shared HTTP constants (headers, problem URIs, body limits).

pub(crate) const HEADER_API_KEY: &str = "x-api-key";
pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_ACCEL_BUFFERING: &str = "x-accel-buffering";

pub(crate) const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
pub(crate) const PROBLEM_INTERNAL: &str = "https://plyorde.dev/problems/internal";
pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://plyorde.dev/problems/unauthorized";
pub(crate) const PROBLEM_FORBIDDEN: &str = "https://plyorde.dev/problems/forbidden";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://plyorde.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://plyorde.dev/problems/not-found";
pub(crate) const PROBLEM_CONFLICT: &str = "https://plyorde.dev/problems/conflict";
pub(crate) const PROBLEM_CONNECTOR: &str = "https://plyorde.dev/problems/connector";
pub(crate) const PROBLEM_BAD_GATEWAY: &str = "https://plyorde.dev/problems/bad-gateway";

/// Largest multipart upload accepted in one request.
pub(crate) const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
