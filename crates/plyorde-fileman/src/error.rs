//! Error types for file-manager orchestration.

use std::io;

use async_zip::error::ZipError;
use plyorde_connector::ConnectorError;
use thiserror::Error;

/// Result alias for file-manager operations.
pub type FileManagerResult<T> = Result<T, FileManagerError>;

/// Failures raised by file-manager operations.
#[derive(Debug, Error)]
pub enum FileManagerError {
    /// Traversal attempt or a path outside the permitted root.
    #[error("invalid path")]
    InvalidPath {
        /// Path as supplied by the caller.
        value: String,
        /// Why the path was rejected.
        reason: &'static str,
    },
    /// A required argument was missing or malformed.
    #[error("invalid input")]
    InvalidInput {
        /// Argument that failed validation.
        field: &'static str,
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable explanation.
        reason: &'static str,
    },
    /// Every candidate name for a write was already taken.
    #[error("no free name available")]
    NameExhausted {
        /// Name the caller asked for.
        name: String,
        /// Number of names tried.
        attempts: u32,
    },
    /// The destination of a move lies inside one of the moved entries.
    #[error("cannot move an entry into itself")]
    MoveIntoSelf {
        /// Entry being moved.
        moved: String,
        /// Requested destination directory.
        destination: String,
    },
    /// A zip download asked for more entries than allowed.
    #[error("too many archive entries")]
    ArchiveLimit {
        /// Entries requested.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The zip writer failed.
    #[error("failed to write archive")]
    Archive {
        /// Archive step that failed.
        operation: &'static str,
        /// Underlying zip error.
        source: ZipError,
    },
    /// Moving bytes into the archive pipe failed.
    #[error("archive stream failed")]
    Io {
        /// Archive step that failed.
        operation: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The connector call failed.
    #[error("connector request failed")]
    Connector {
        /// Underlying connector error.
        #[from]
        source: ConnectorError,
    },
}

impl FileManagerError {
    pub(crate) fn invalid_path(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            value: value.into(),
            reason,
        }
    }

    pub(crate) const fn invalid_input(
        field: &'static str,
        code: &'static str,
        reason: &'static str,
    ) -> Self {
        Self::InvalidInput {
            field,
            code,
            reason,
        }
    }

    /// Stable code for API error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "invalid_path",
            Self::InvalidInput { code, .. } => code,
            Self::NameExhausted { .. } => "name_exhausted",
            Self::MoveIntoSelf { .. } => "move_into_self",
            Self::ArchiveLimit { .. } => "too_many_entries",
            Self::Archive { .. } | Self::Io { .. } => "archive_failed",
            Self::Connector {
                source: ConnectorError::Status { .. },
            } => "connector_error",
            Self::Connector { .. } => "connector_unreachable",
        }
    }

    /// Human-readable description, used for per-item batch failures.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidPath { reason, .. } => format!("Invalid path: {reason}"),
            Self::InvalidInput { reason, .. } => (*reason).to_string(),
            Self::NameExhausted { name, .. } => format!("Could not pick a free name for {name}"),
            Self::MoveIntoSelf { moved, .. } => {
                format!("Cannot move {moved} into itself or one of its subfolders")
            }
            Self::ArchiveLimit { requested, max } => {
                format!("Too many files requested ({requested}); the limit is {max}")
            }
            Self::Archive { source, .. } => format!("failed to write archive: {source}"),
            Self::Io { source, .. } => format!("archive stream failed: {source}"),
            Self::Connector { source } => source.detail(),
        }
    }

    /// Connector status carried by the error, if any.
    #[must_use]
    pub const fn connector_status(&self) -> Option<u16> {
        match self {
            Self::Connector { source } => source.status(),
            _ => None,
        }
    }
}
