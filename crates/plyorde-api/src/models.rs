//! Response bodies shared across handlers.

use plyorde_connector::FileEntry;
use plyorde_fileman::{
    CopiedEntry, CopyFailure, DeleteFailure, MoveFailure, MovedEntry, RenameOutcome,
};
use serde::{Deserialize, Serialize};

/// RFC 9457 problem document with a machine-readable `code` extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short summary of the problem.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Specific explanation, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Stable error code for programmatic handling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Body of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListResponse {
    /// Entries reported by the connector.
    pub entries: Vec<FileEntry>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving.
    pub status: String,
    /// Build identifier.
    pub build: String,
}

/// Body returned after a file was written or created.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SavedResponse {
    /// Always true.
    pub ok: bool,
    /// Normalized path of the file or folder.
    pub path: String,
}

/// Body returned after a rename.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenameResponse {
    /// Always true.
    pub ok: bool,
    /// Rename details.
    #[serde(flatten)]
    pub outcome: RenameOutcome,
}

/// Body returned by a move batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MoveResponse {
    /// True when nothing failed.
    pub ok: bool,
    /// Entries moved.
    pub moved: Vec<MovedEntry>,
    /// Entries left in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<MoveFailure>,
}

/// Body returned by a copy batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CopyResponse {
    /// True when nothing failed.
    pub ok: bool,
    /// Copies made.
    pub copied: Vec<CopiedEntry>,
    /// Sources that could not be copied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<CopyFailure>,
}

/// Body returned by a delete batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeleteResponse {
    /// True when nothing failed.
    pub ok: bool,
    /// Paths deleted.
    pub deleted: Vec<String>,
    /// Paths that remain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<DeleteFailure>,
}
