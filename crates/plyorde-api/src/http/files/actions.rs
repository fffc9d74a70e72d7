//! Closed set of file actions and their dispatcher.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use plyorde_config::Permission;
use plyorde_connector::{PayloadKind, ReadPayload, SiteConnectorContext};
use plyorde_fileman::{CopyOptions, FileManager};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::errors::ApiError;
use crate::models::{CopyResponse, DeleteResponse, MoveResponse, RenameResponse, SavedResponse};

/// Read a file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReadBody {
    /// File to read.
    #[serde(default)]
    pub path: String,
}

/// Create or overwrite a file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WriteBody {
    /// File to write.
    pub path: String,
    /// Text, or base64 when `encoding` says so.
    #[serde(default)]
    pub content: String,
    /// Encoding of `content`; text when omitted.
    #[serde(default)]
    pub encoding: Option<PayloadKind>,
}

/// Create an empty file or a folder.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreateBody {
    /// Directory to create the entry in.
    #[serde(default, alias = "path", alias = "directory")]
    pub parent: String,
    /// New entry name.
    #[serde(default)]
    pub name: String,
}

/// Rename an entry in place.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RenameBody {
    /// Entry to rename.
    pub path: String,
    /// New name.
    #[serde(alias = "newName")]
    pub name: String,
}

/// Move entries into a directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MoveBody {
    /// Entries to move.
    #[serde(default, alias = "ids")]
    pub paths: Vec<String>,
    /// Target directory; the site root when empty.
    #[serde(default)]
    pub destination: String,
}

/// Copy files into a directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CopyBody {
    /// Files to copy.
    #[serde(default, alias = "sources", alias = "ids")]
    pub paths: Vec<String>,
    /// Target directory; the site root when empty.
    #[serde(default)]
    pub destination: String,
    /// Copies in flight.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Rename attempts per file.
    #[serde(default)]
    pub max_rename_attempts: Option<u32>,
}

/// Delete entries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeleteBody {
    /// Entries to delete.
    #[serde(default, alias = "ids")]
    pub paths: Vec<String>,
}

/// Create an archive on the connector host.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ArchiveBody {
    /// Entries to include.
    #[serde(default, alias = "paths")]
    pub sources: Vec<String>,
    /// Archive path; next to the first source when omitted.
    #[serde(default)]
    pub target: Option<String>,
    /// Archive format.
    #[serde(default)]
    pub format: Option<String>,
}

/// Zip entries in place under a timestamped name.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CompressHereBody {
    /// Entries to include.
    #[serde(default, alias = "ids", alias = "sources")]
    pub paths: Vec<String>,
    /// Directory receiving the archive; next to the first entry when omitted.
    #[serde(default, alias = "parentId")]
    pub parent: Option<String>,
}

/// One path, a list of paths, or a JSON-encoded list in a string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceList {
    /// Several paths.
    Many(Vec<String>),
    /// A single path or a JSON array string.
    One(String),
}

impl SourceList {
    /// Flatten into a list of paths.
    #[must_use]
    pub fn into_paths(self) -> Vec<String> {
        match self {
            Self::Many(paths) => paths,
            Self::One(raw) => {
                if raw.trim_start().starts_with('[')
                    && let Ok(paths) = serde_json::from_str::<Vec<String>>(&raw)
                {
                    return paths;
                }
                vec![raw]
            }
        }
    }
}

/// Extract an archive on the connector host.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExtractBody {
    /// Archive to extract; exactly one is allowed.
    #[serde(default, alias = "source")]
    pub sources: Option<SourceList>,
    /// Directory to extract into.
    #[serde(default)]
    pub target: String,
    /// Archive format hint.
    #[serde(default)]
    pub format: Option<String>,
}

/// Every operation accepted by `POST /actions`, tagged by `action`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum FileAction {
    /// Read a file.
    Read(ReadBody),
    /// Write a file.
    Write(WriteBody),
    /// Create an empty file.
    CreateFile(CreateBody),
    /// Create a folder.
    CreateFolder(CreateBody),
    /// Rename an entry.
    Rename(RenameBody),
    /// Move entries.
    Move(MoveBody),
    /// Copy files.
    Copy(CopyBody),
    /// Delete entries.
    Delete(DeleteBody),
    /// Create an archive.
    Archive(ArchiveBody),
    /// Zip entries in place.
    CompressHere(CompressHereBody),
    /// Extract an archive.
    Extract(ExtractBody),
}

impl FileAction {
    /// Permission the caller needs for this action.
    #[must_use]
    pub const fn permission(&self) -> Permission {
        match self {
            Self::Read(_) => Permission::Read,
            Self::Write(_) | Self::CreateFile(_) | Self::CreateFolder(_) => Permission::Write,
            Self::Rename(_) => Permission::Rename,
            Self::Move(_) => Permission::Move,
            Self::Copy(_) => Permission::Copy,
            Self::Delete(_) => Permission::Delete,
            Self::Archive(_) | Self::CompressHere(_) => Permission::Archive,
            Self::Extract(_) => Permission::Extract,
        }
    }

    /// Action name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Write(_) => "write",
            Self::CreateFile(_) => "createFile",
            Self::CreateFolder(_) => "createFolder",
            Self::Rename(_) => "rename",
            Self::Move(_) => "move",
            Self::Copy(_) => "copy",
            Self::Delete(_) => "delete",
            Self::Archive(_) => "archive",
            Self::CompressHere(_) => "compressHere",
            Self::Extract(_) => "extract",
        }
    }

    pub(crate) async fn run(
        self,
        files: &FileManager,
        ctx: &SiteConnectorContext,
    ) -> Result<Response, ApiError> {
        let response = match self {
            Self::Read(body) => Json(files.read(ctx, &body.path).await?).into_response(),
            Self::Write(body) => {
                let payload = ReadPayload {
                    kind: body.encoding.unwrap_or(PayloadKind::Text),
                    content: body.content,
                };
                let path = files.write(ctx, &body.path, &payload).await?;
                saved(path)
            }
            Self::CreateFile(body) => saved(files.create_file(ctx, &body.parent, &body.name).await?),
            Self::CreateFolder(body) => {
                saved(files.create_folder(ctx, &body.parent, &body.name).await?)
            }
            Self::Rename(body) => {
                let outcome = files.rename(ctx, &body.path, &body.name).await?;
                Json(RenameResponse { ok: true, outcome }).into_response()
            }
            Self::Move(body) => {
                require_paths(&body.paths)?;
                let report = files
                    .move_entries(ctx, &body.paths, &body.destination)
                    .await?;
                let ok = report.failed.is_empty();
                settled(
                    ok,
                    MoveResponse {
                        ok,
                        moved: report.moved,
                        failed: report.failed,
                    },
                )
            }
            Self::Copy(body) => {
                require_paths(&body.paths)?;
                let options = CopyOptions {
                    concurrency: body.concurrency,
                    max_rename_attempts: body.max_rename_attempts,
                    allowed_root: None,
                };
                let report = files
                    .copy(ctx, &body.paths, &body.destination, &options)
                    .await;
                let ok = report.failed.is_empty();
                settled(
                    ok,
                    CopyResponse {
                        ok,
                        copied: report.ok,
                        failed: report.failed,
                    },
                )
            }
            Self::Delete(body) => {
                require_paths(&body.paths)?;
                let report = files.delete(ctx, &body.paths).await;
                let ok = report.failed.is_empty();
                settled(
                    ok,
                    DeleteResponse {
                        ok,
                        deleted: report.deleted,
                        failed: report.failed,
                    },
                )
            }
            Self::Archive(body) => Json(
                files
                    .archive(
                        ctx,
                        &body.sources,
                        body.target.as_deref(),
                        body.format.as_deref(),
                    )
                    .await?,
            )
            .into_response(),
            Self::CompressHere(body) => Json(
                files
                    .compress_here(ctx, &body.paths, body.parent.as_deref())
                    .await?,
            )
            .into_response(),
            Self::Extract(body) => {
                let sources = body.sources.map(SourceList::into_paths).unwrap_or_default();
                let result = files
                    .extract(ctx, &sources, &body.target, body.format.as_deref())
                    .await?;
                info!(site_id = ctx.site_id(), "archive extracted");
                Json(result).into_response()
            }
        };
        Ok(response)
    }
}

fn saved(path: String) -> Response {
    Json(SavedResponse { ok: true, path }).into_response()
}

/// Batch results are 200 when complete and 400 when any item failed.
fn settled<T: Serialize>(ok: bool, body: T) -> Response {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(body)).into_response()
}

fn require_paths(paths: &[String]) -> Result<(), ApiError> {
    if paths.iter().all(|path| path.trim().is_empty()) {
        return Err(
            ApiError::bad_request("At least one path is required").with_code("missing_paths")
        );
    }
    Ok(())
}
