//! Route handlers for single-shot file actions.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRequest, Path, Request, State},
    response::Response,
};
use plyorde_config::{ApiCredential, Permission};
use plyorde_telemetry::record_file_action;
use serde::Deserialize;
use tracing::debug;

use crate::http::errors::ApiError;
use crate::http::files::actions::{
    ArchiveBody, CompressHereBody, CopyBody, CreateBody, DeleteBody, ExtractBody, FileAction,
    MoveBody, ReadBody, RenameBody, SourceList, WriteBody,
};
use crate::http::files::extract::{FormFields, JsonBody, QueryParams, has_json_body};
use crate::models::ListResponse;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub(crate) struct PathQuery {
    #[serde(default)]
    pub(crate) path: String,
}

// `sources` may repeat, and a single value may hold a JSON array.
impl From<FormFields> for ExtractBody {
    fn from(form: FormFields) -> Self {
        let mut raw = form.all("sources");
        raw.extend(form.all("source"));
        let sources = match raw.len() {
            0 => None,
            1 => Some(SourceList::One(raw.remove(0))),
            _ => Some(SourceList::Many(raw)),
        };
        Self {
            sources,
            target: form.last("target").unwrap_or_default(),
            format: form.last("format").filter(|format| !format.trim().is_empty()),
        }
    }
}

/// Authorize the action and run it.
pub(crate) async fn execute(
    state: &ApiState,
    credential: &ApiCredential,
    site_id: &str,
    action: FileAction,
) -> Result<Response, ApiError> {
    record_file_action(action.name());
    let ctx = state
        .site_context(credential, site_id, action.permission())
        .await?;
    debug!(site_id, action = action.name(), "running file action");
    action.run(&state.files, &ctx).await
}

pub(crate) async fn list_files(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    QueryParams(query): QueryParams<PathQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    record_file_action("list");
    let ctx = state
        .site_context(&credential, &site_id, Permission::Read)
        .await?;
    let entries = state.files.list(&ctx, &query.path).await?;
    Ok(Json(ListResponse { entries }))
}

pub(crate) async fn read_file(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    QueryParams(query): QueryParams<PathQuery>,
) -> Result<Response, ApiError> {
    let action = FileAction::Read(ReadBody { path: query.path });
    execute(&state, &credential, &site_id, action).await
}

pub(crate) async fn write_file(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<WriteBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Write(body)).await
}

pub(crate) async fn create_file(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<CreateBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::CreateFile(body)).await
}

pub(crate) async fn create_folder(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<CreateBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::CreateFolder(body)).await
}

pub(crate) async fn rename_entry(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<RenameBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Rename(body)).await
}

pub(crate) async fn move_entries(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<MoveBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Move(body)).await
}

pub(crate) async fn copy_entries(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<CopyBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Copy(body)).await
}

pub(crate) async fn delete_entries(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<DeleteBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Delete(body)).await
}

pub(crate) async fn archive_entries(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(body): JsonBody<ArchiveBody>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, FileAction::Archive(body)).await
}

impl From<FormFields> for CompressHereBody {
    fn from(form: FormFields) -> Self {
        let mut paths = form.all("ids");
        paths.extend(form.all("paths"));
        Self {
            paths,
            parent: form.last("parentId").or_else(|| form.last("parent")),
        }
    }
}

/// Accepts a JSON body or a urlencoded form.
pub(crate) async fn compress_here(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let body = if has_json_body(request.headers()) {
        let JsonBody(body) = JsonBody::<CompressHereBody>::from_request(request, &()).await?;
        body
    } else {
        FormFields::from_request(request, &()).await?.into()
    };
    execute(&state, &credential, &site_id, FileAction::CompressHere(body)).await
}

/// Accepts a JSON body or a urlencoded form.
pub(crate) async fn extract_archive(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let body = if has_json_body(request.headers()) {
        let JsonBody(body) = JsonBody::<ExtractBody>::from_request(request, &()).await?;
        body
    } else {
        FormFields::from_request(request, &()).await?.into()
    };
    execute(&state, &credential, &site_id, FileAction::Extract(body)).await
}

pub(crate) async fn run_action(
    State(state): State<Arc<ApiState>>,
    Extension(credential): Extension<ApiCredential>,
    Path(site_id): Path<String>,
    JsonBody(action): JsonBody<FileAction>,
) -> Result<Response, ApiError> {
    execute(&state, &credential, &site_id, action).await
}
