//! Wire shapes exchanged with the connector.

use std::fmt;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorResult;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
}

/// Directory entry as reported by the connector's list endpoint.
///
/// `id` is the entry's full relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Relative path of the entry.
    #[serde(alias = "path")]
    pub id: String,
    /// Last path segment.
    pub name: String,
    /// File or folder.
    pub kind: EntryKind,
    /// Path of the containing directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Size in bytes; zero for folders.
    #[serde(default)]
    pub size: u64,
    /// Last modification time as reported by the connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// Extension without the dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Whether the connector can extract this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archive: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub(crate) entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MkdirRequest<'a> {
    pub(crate) path: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MoveRequest<'a> {
    pub(crate) from: &'a str,
    pub(crate) to: &'a str,
}

/// Body of a compress call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressRequest {
    /// Paths to include in the archive.
    pub sources: Vec<String>,
    /// Archive path to create.
    pub target: String,
    /// Archive format, `zip` when omitted by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Body of a decompress call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompressRequest {
    /// Archive to extract.
    pub source: String,
    /// Directory to extract into.
    pub target: String,
    /// Archive format hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// File handed to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Name the file is stored under.
    pub file_name: String,
    /// Client-declared content type.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// Streaming download returned by the connector.
pub struct RemoteDownload {
    /// Connector status (200 or 206 for range requests).
    pub status: StatusCode,
    /// Headers worth passing through to the caller.
    pub headers: HeaderMap,
    /// Response body; errors mid-stream end the download.
    pub body: BoxStream<'static, ConnectorResult<Bytes>>,
}

impl fmt::Debug for RemoteDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDownload")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
