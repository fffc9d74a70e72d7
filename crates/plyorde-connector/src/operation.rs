//! Connector operation table.

use std::time::Duration;

use reqwest::Method;

/// Timeout applied to list/read/write/mkdir/move/delete.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout applied to compress/decompress.
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote operation exposed under `/api/filemanager/{siteId}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorOp {
    /// `GET list?path=`
    List,
    /// `GET read?path=`
    Read,
    /// `POST write?path=`
    Write,
    /// `POST mkdir`
    Mkdir,
    /// `POST move`
    Move,
    /// `DELETE delete?path=`
    Delete,
    /// `POST compress`
    Compress,
    /// `POST decompress`
    Decompress,
    /// `POST upload?path=` (multipart)
    Upload,
    /// `GET download?path=`
    Download,
}

impl ConnectorOp {
    /// Final URL path segment.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Read => "read",
            Self::Write => "write",
            Self::Mkdir => "mkdir",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Compress => "compress",
            Self::Decompress => "decompress",
            Self::Upload => "upload",
            Self::Download => "download",
        }
    }

    /// Name used in logs, metrics and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.segment()
    }

    /// HTTP method of the operation.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::List | Self::Read | Self::Download => Method::GET,
            Self::Delete => Method::DELETE,
            Self::Write
            | Self::Mkdir
            | Self::Move
            | Self::Compress
            | Self::Decompress
            | Self::Upload => Method::POST,
        }
    }

    /// Per-call timeout; `None` for streaming transfers.
    #[must_use]
    pub const fn timeout(self, timeouts: &ConnectorTimeouts) -> Option<Duration> {
        match self {
            Self::List
            | Self::Read
            | Self::Write
            | Self::Mkdir
            | Self::Move
            | Self::Delete => Some(timeouts.metadata),
            Self::Compress | Self::Decompress => Some(timeouts.archive),
            Self::Upload | Self::Download => None,
        }
    }
}

/// Timeouts applied by [`crate::ConnectorClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorTimeouts {
    /// Metadata and text operations.
    pub metadata: Duration,
    /// Server-side archive operations.
    pub archive: Duration,
}

impl Default for ConnectorTimeouts {
    fn default() -> Self {
        Self {
            metadata: DEFAULT_METADATA_TIMEOUT,
            archive: DEFAULT_ARCHIVE_TIMEOUT,
        }
    }
}
