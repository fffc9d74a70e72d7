//! Default values applied when the configuration document omits a field.

/// Port the HTTP listener binds to by default.
pub const DEFAULT_BIND_PORT: u16 = 7070;
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Timeout for list/read/write/mkdir/move/delete connector calls.
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 10;
/// Timeout for compress/decompress connector calls.
pub const DEFAULT_ARCHIVE_TIMEOUT_SECS: u64 = 60;
/// Worker count used by bulk copy when the caller does not choose one.
pub const DEFAULT_COPY_CONCURRENCY: usize = 4;
/// Upper bound on bulk copy workers.
pub const MAX_COPY_CONCURRENCY: usize = 16;
/// Rename attempts used by bulk copy when the caller does not choose a value.
pub const DEFAULT_COPY_RENAME_ATTEMPTS: u32 = 50;
/// Upper bound on bulk copy rename attempts.
pub const MAX_COPY_RENAME_ATTEMPTS: u32 = 200;
/// Worker count for multi-file uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;
/// Rename attempts for a single uploaded file.
pub const DEFAULT_UPLOAD_RENAME_ATTEMPTS: u32 = 25;
/// Items deleted per chunk.
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 10;
/// Pause between delete chunks, in milliseconds.
pub const DEFAULT_DELETE_PAUSE_MS: u64 = 200;
/// Maximum number of paths accepted by a single zip download.
pub const DEFAULT_ARCHIVE_MAX_ENTRIES: usize = 200;
/// Port assumed for connector addresses stored without scheme and port.
pub const DEFAULT_CONNECTOR_PORT: u16 = 8080;
/// Allowed-site marker granting an API key access to every site.
pub const ALL_SITES: &str = "*";
