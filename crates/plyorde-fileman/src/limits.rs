//! Tunables for bulk operations.

use std::time::Duration;

/// Most copies allowed in flight at once.
pub const MAX_COPY_CONCURRENCY: usize = 16;
/// Most rename attempts allowed for a single copy.
pub const MAX_RENAME_ATTEMPTS: u32 = 200;

/// Limits applied by [`crate::FileManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManagerLimits {
    /// Default copy concurrency.
    pub copy_concurrency: usize,
    /// Default rename attempts per copied file.
    pub copy_max_rename_attempts: u32,
    /// Uploads in flight at once.
    pub upload_concurrency: usize,
    /// Rename attempts per uploaded file.
    pub upload_max_rename_attempts: u32,
    /// Deletes per chunk.
    pub delete_chunk_size: usize,
    /// Pause between delete chunks.
    pub delete_pause: Duration,
    /// Most entries in a zip download.
    pub archive_max_entries: usize,
}

impl Default for FileManagerLimits {
    fn default() -> Self {
        Self {
            copy_concurrency: 4,
            copy_max_rename_attempts: 50,
            upload_concurrency: 4,
            upload_max_rename_attempts: 25,
            delete_chunk_size: 10,
            delete_pause: Duration::from_millis(200),
            archive_max_entries: 200,
        }
    }
}

/// Per-call copy options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Copies in flight; clamped to `1..=16`.
    pub concurrency: Option<usize>,
    /// Rename attempts per file; clamped to `1..=200`.
    pub max_rename_attempts: Option<u32>,
    /// Root that sources and destination must stay within.
    pub allowed_root: Option<String>,
}

impl CopyOptions {
    pub(crate) fn concurrency(&self, limits: &FileManagerLimits) -> usize {
        self.concurrency
            .unwrap_or(limits.copy_concurrency)
            .clamp(1, MAX_COPY_CONCURRENCY)
    }

    pub(crate) fn max_rename_attempts(&self, limits: &FileManagerLimits) -> u32 {
        self.max_rename_attempts
            .unwrap_or(limits.copy_max_rename_attempts)
            .clamp(1, MAX_RENAME_ATTEMPTS)
    }
}
