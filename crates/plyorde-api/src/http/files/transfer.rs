//! Streaming transfers: upload, single download and zip download.
//!
//! # Design
//! - Bodies are streamed straight through; nothing is buffered to disk.
//! - A download forwards the client's `Range`, keeps the connector's status
//!   and selected headers, and disables caching and proxy buffering.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Body,
    extract::{FromRequest, Multipart, Path, RawQuery, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{
            CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, PRAGMA, RANGE, X_CONTENT_TYPE_OPTIONS,
        },
    },
    response::{IntoResponse, Response},
};
use plyorde_config::{ApiCredential, Permission};
use plyorde_connector::UploadFile;
use plyorde_fileman::ArchiveDownload;
use plyorde_telemetry::record_file_action;
use serde::Deserialize;
use tracing::info;

use crate::http::constants::HEADER_ACCEL_BUFFERING;
use crate::http::errors::ApiError;
use crate::http::files::extract::{FormFields, JsonBody, QueryParams, has_json_body};
use crate::http::files::handlers::PathQuery;
use crate::state::ApiState;

const UPLOAD_FIELD: &str = "file";
const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(default)]
    path: String,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ZipRequest {
    #[serde(default, alias = "ids")]
    paths: Vec<String>,
    #[serde(default)]
    name: Option<String>,
}

impl ZipRequest {
    /// Read `paths` (also `paths[]`, `path` and `ids`) and `name` from
    /// urlencoded pairs.
    fn from_form(form: &FormFields) -> Self {
        let mut paths = form.all("paths");
        paths.extend(form.all("path"));
        paths.extend(form.all("ids"));
        Self {
            paths,
            name: form.last("name"),
        }
    }
}

pub(crate) async fn upload_files(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    QueryParams(query): QueryParams<PathQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    record_file_action("upload");
    let ctx = state
        .site_context(&credential, &site_id, Permission::Upload)
        .await?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) && field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }
    if files.is_empty() {
        return Err(ApiError::bad_request("No files were uploaded").with_code("missing_files"));
    }

    let report = state.files.upload(&ctx, &query.path, files).await?;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(report)).into_response())
}

pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    QueryParams(query): QueryParams<DownloadQuery>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    record_file_action("download");
    let ctx = state
        .site_context(&credential, &site_id, Permission::Download)
        .await?;
    let range = request_headers
        .get(RANGE)
        .and_then(|value| value.to_str().ok());
    let download = state
        .files
        .download(&ctx, &query.path, query.filename.as_deref(), range)
        .await?;

    let mut response = Response::new(Body::from_stream(download.body));
    *response.status_mut() = download.status;
    let headers = response.headers_mut();
    headers.extend(download.headers);
    apply_no_store(headers);
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    Ok(response)
}

pub(crate) async fn download_zip_post(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let request = if has_json_body(request.headers()) {
        let JsonBody(body) = JsonBody::<ZipRequest>::from_request(request, &()).await?;
        body
    } else {
        ZipRequest::from_form(&FormFields::from_request(request, &()).await?)
    };
    download_zip(&state, &credential, &site_id, request).await
}

pub(crate) async fn download_zip_get(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let form = FormFields::parse(raw.unwrap_or_default().as_bytes());
    let request = ZipRequest::from_form(&form);
    download_zip(&state, &credential, &site_id, request).await
}

async fn download_zip(
    state: &ApiState,
    credential: &ApiCredential,
    site_id: &str,
    request: ZipRequest,
) -> Result<Response, ApiError> {
    record_file_action("downloadZip");
    let ctx = state
        .site_context(credential, site_id, Permission::Download)
        .await?;
    let ArchiveDownload { filename, body } =
        state
            .files
            .download_zip(&ctx, &request.paths, request.name.as_deref())?;
    info!(site_id, filename = %filename, "streaming zip download");

    let disposition = HeaderValue::from_bytes(
        format!("attachment; filename=\"{filename}\"").as_bytes(),
    )
    .map_err(|_| ApiError::bad_request("archive name is not a valid header value"))?;

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(ZIP_CONTENT_TYPE));
    headers.insert(CONTENT_DISPOSITION, disposition);
    apply_no_store(headers);
    Ok(response)
}

fn apply_no_store(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        HeaderName::from_static(HEADER_ACCEL_BUFFERING),
        HeaderValue::from_static("no"),
    );
}
