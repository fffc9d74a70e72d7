//! Results of bulk and mutating operations, serialized as API responses.

use serde::Serialize;

/// Result of a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    /// False when the new name equals the old one.
    pub renamed: bool,
    /// Original path.
    pub from: String,
    /// New path.
    pub to: String,
}

/// One entry that was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedEntry {
    /// Original path.
    pub from: String,
    /// New path.
    pub to: String,
}

/// One entry that failed to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    /// Original path.
    pub from: String,
    /// Attempted destination.
    pub to: String,
    /// Connector message.
    pub error: String,
}

/// Result of a move batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    /// Moved entries.
    pub moved: Vec<MovedEntry>,
    /// Entries left in place.
    pub failed: Vec<MoveFailure>,
}

/// One file that was copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedEntry {
    /// Source path.
    pub source: String,
    /// Path of the new copy.
    pub dest: String,
}

/// One source that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    /// Source path as supplied.
    pub source: String,
    /// Why the copy failed.
    pub error: String,
}

/// Result of a copy batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    /// Copies made, in input order.
    pub ok: Vec<CopiedEntry>,
    /// Sources that failed, in input order.
    pub failed: Vec<CopyFailure>,
}

/// One path that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    /// Path as supplied.
    pub path: String,
    /// Why the delete failed.
    pub error: String,
}

/// Result of a delete batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Deleted paths.
    pub deleted: Vec<String>,
    /// Paths that remain.
    pub failed: Vec<DeleteFailure>,
}

/// Outcome for a single uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Whether the file was stored.
    pub ok: bool,
    /// Name the client sent.
    pub name: String,
    /// Name the file was stored under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_as: Option<String>,
    /// Last candidate name tried by a failed upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_as: Option<String>,
    /// Stored path, or the last candidate path of a failed upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// HTTP-like status of a failed upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Why the upload failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    /// A stored file.
    #[must_use]
    pub const fn saved(name: String, saved_as: String, path: String) -> Self {
        Self {
            ok: true,
            name,
            saved_as: Some(saved_as),
            attempted_as: None,
            path: Some(path),
            status: None,
            error: None,
        }
    }

    /// A file that was not stored.
    #[must_use]
    pub const fn failed(name: String, status: u16, error: String) -> Self {
        Self {
            ok: false,
            name,
            saved_as: None,
            attempted_as: None,
            path: None,
            status: Some(status),
            error: Some(error),
        }
    }

    /// Record the last candidate tried.
    #[must_use]
    pub fn attempted(mut self, name: String, path: String) -> Self {
        self.attempted_as = Some(name);
        self.path = Some(path);
        self
    }
}

/// Result of a multi-file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    /// True when every file was stored.
    pub ok: bool,
    /// Files stored.
    pub uploaded: usize,
    /// Files not stored, omitted when zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<usize>,
    /// Per-file outcomes in upload order.
    pub results: Vec<UploadResult>,
}

impl UploadReport {
    pub(crate) fn from_results(results: Vec<UploadResult>) -> Self {
        let uploaded = results.iter().filter(|result| result.ok).count();
        let failed = results.len() - uploaded;
        Self {
            ok: failed == 0,
            uploaded,
            failed_count: (failed > 0).then_some(failed),
            results,
        }
    }
}
