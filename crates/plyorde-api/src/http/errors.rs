//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, QueryRejection},
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use plyorde_config::AccessError;
use plyorde_connector::ConnectorError;
use plyorde_fileman::FileManagerError;
use plyorde_telemetry::{current_route, current_site_id};
use tracing::{error, warn};

use crate::http::constants::{
    PROBLEM_BAD_GATEWAY, PROBLEM_BAD_REQUEST, PROBLEM_CONFLICT, PROBLEM_CONNECTOR,
    PROBLEM_CONTENT_TYPE, PROBLEM_FORBIDDEN, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
    PROBLEM_UNAUTHORIZED,
};
use crate::models::ProblemDetails;

/// Structured API error rendered as a problem document.
#[derive(Debug)]
pub struct ApiError {
    pub(crate) status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    pub(crate) code: Option<&'static str>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            code: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) const fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(detail)
    }

    pub(crate) fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            PROBLEM_UNAUTHORIZED,
            "authentication required",
        )
        .with_detail(detail)
    }

    pub(crate) fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, PROBLEM_FORBIDDEN, "forbidden").with_detail(detail)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, PROBLEM_CONFLICT, "conflict").with_detail(detail)
    }

    pub(crate) fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            PROBLEM_BAD_GATEWAY,
            "connector unavailable",
        )
        .with_detail(detail)
    }

    fn connector(err: &ConnectorError) -> Self {
        match err.status().and_then(|status| StatusCode::from_u16(status).ok()) {
            Some(status) if status.is_client_error() || status.is_server_error() => {
                Self::new(status, PROBLEM_CONNECTOR, "connector request failed")
                    .with_detail(err.detail())
            }
            _ => Self::bad_gateway(err.detail()),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Unauthorized => Self::unauthorized(value.to_string()),
            AccessError::Forbidden { .. } => Self::forbidden(value.to_string()),
            AccessError::NotFound { site_id } => {
                Self::not_found(format!("site {site_id} or its connector was not found"))
            }
        }
    }
}

impl From<FileManagerError> for ApiError {
    fn from(value: FileManagerError) -> Self {
        let code = value.code();
        let api_error = match &value {
            FileManagerError::InvalidPath { .. }
            | FileManagerError::InvalidInput { .. }
            | FileManagerError::MoveIntoSelf { .. }
            | FileManagerError::ArchiveLimit { .. } => Self::bad_request(value.detail()),
            FileManagerError::NameExhausted { .. } => Self::conflict(value.detail()),
            FileManagerError::Connector { source } => {
                warn!(
                    route = current_route().as_deref().unwrap_or("-"),
                    site_id = current_site_id().as_deref().unwrap_or("-"),
                    operation = source.operation(),
                    error = %source,
                    detail = %source.detail(),
                    "connector call failed"
                );
                Self::connector(source)
            }
            FileManagerError::Archive { .. } | FileManagerError::Io { .. } => {
                error!(error = %value, detail = %value.detail(), "archive failure");
                Self::internal(value.detail())
            }
        };
        api_error.with_code(code)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request(value.body_text()).with_code("invalid_body")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request(value.body_text()).with_code("invalid_query")
    }
}

impl From<BytesRejection> for ApiError {
    fn from(value: BytesRejection) -> Self {
        Self::bad_request(value.body_text()).with_code("invalid_body")
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        Self::bad_request(value.body_text()).with_code("invalid_upload")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            code: self.code.map(str::to_string),
        };
        let mut response = (self.status, Json(body)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}
