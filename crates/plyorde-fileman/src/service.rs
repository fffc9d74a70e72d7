//! File-manager operations over a site's connector.
//!
//! # Design
//! - Every caller-supplied path is normalized before it reaches the
//!   connector.
//! - Single-item operations propagate connector failures; bulk operations
//!   record them per item and always settle.
//! - Move is the exception among bulk operations: a destination inside one of
//!   the sources rejects the whole request before any remote call.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use plyorde_connector::{
    CompressRequest, DecompressRequest, FileConnector, FileEntry, ReadPayload, RemoteDownload,
    SiteConnectorContext, UploadFile,
};
use plyorde_telemetry::{Metrics, Outcome};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveDownload, stream_zip, zip_filename};
use crate::batch::{run_batch, run_chunked};
use crate::error::{FileManagerError, FileManagerResult};
use crate::limits::{CopyOptions, FileManagerLimits};
use crate::naming::{PlacementError, place_with_unique_name};
use crate::path::{
    assert_within_root, file_name, join, normalize, parent, self_and_ancestors, validate_name,
};
use crate::report::{
    CopiedEntry, CopyFailure, CopyReport, DeleteFailure, DeleteReport, MoveFailure, MoveReport,
    MovedEntry, RenameOutcome, UploadReport, UploadResult,
};

/// Orchestrates file operations for any site.
#[derive(Clone)]
pub struct FileManager {
    connector: Arc<dyn FileConnector>,
    limits: FileManagerLimits,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl FileManager {
    /// Build a manager over the given connector.
    #[must_use]
    pub fn new(connector: Arc<dyn FileConnector>, limits: FileManagerLimits) -> Self {
        Self {
            connector,
            limits,
            metrics: None,
        }
    }

    /// Record batch outcomes and archive streams in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Limits in effect.
    #[must_use]
    pub const fn limits(&self) -> &FileManagerLimits {
        &self.limits
    }

    fn record_item(&self, operation: &str, item: &str, error: Option<&str>) {
        if let Some(error) = error {
            warn!(operation, item, error, "batch item failed");
        }
        if let Some(metrics) = &self.metrics {
            let outcome = if error.is_none() {
                Outcome::Success
            } else {
                Outcome::Failure
            };
            metrics.inc_batch_item(operation, outcome);
        }
    }

    /// List a directory; the empty path lists the site root.
    ///
    /// # Errors
    ///
    /// Invalid paths and connector failures.
    pub async fn list(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
    ) -> FileManagerResult<Vec<FileEntry>> {
        let path = normalize(path)?;
        Ok(self.connector.list(ctx, &path).await?)
    }

    /// Read a file.
    ///
    /// # Errors
    ///
    /// Missing or invalid paths and connector failures.
    pub async fn read(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
    ) -> FileManagerResult<ReadPayload> {
        let path = required_path(path)?;
        Ok(self.connector.read(ctx, &path).await?)
    }

    /// Create or overwrite a file, returning its normalized path.
    ///
    /// # Errors
    ///
    /// Missing or invalid paths and connector failures.
    pub async fn write(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        payload: &ReadPayload,
    ) -> FileManagerResult<String> {
        let path = required_path(path)?;
        self.connector.write(ctx, &path, payload).await?;
        Ok(path)
    }

    /// Create an empty file named `name` inside `directory`.
    ///
    /// # Errors
    ///
    /// Invalid names or paths and connector failures.
    pub async fn create_file(
        &self,
        ctx: &SiteConnectorContext,
        directory: &str,
        name: &str,
    ) -> FileManagerResult<String> {
        let path = join(&normalize(directory)?, &validate_name("name", name)?)?;
        self.connector
            .write(ctx, &path, &ReadPayload::text(String::new()))
            .await?;
        Ok(path)
    }

    /// Create a folder named `name` inside `directory`.
    ///
    /// # Errors
    ///
    /// Invalid names or paths and connector failures.
    pub async fn create_folder(
        &self,
        ctx: &SiteConnectorContext,
        directory: &str,
        name: &str,
    ) -> FileManagerResult<String> {
        let path = join(&normalize(directory)?, &validate_name("name", name)?)?;
        self.connector.mkdir(ctx, &path).await?;
        Ok(path)
    }

    /// Rename an entry in place.
    ///
    /// # Errors
    ///
    /// Invalid names or paths and connector failures.
    pub async fn rename(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        new_name: &str,
    ) -> FileManagerResult<RenameOutcome> {
        let from = required_path(path)?;
        let to = join(parent(&from), &validate_name("name", new_name)?)?;
        if to == from {
            return Ok(RenameOutcome {
                renamed: false,
                from,
                to,
            });
        }
        self.connector.move_entry(ctx, &from, &to).await?;
        Ok(RenameOutcome {
            renamed: true,
            from,
            to,
        })
    }

    /// Move entries into `destination`, one at a time.
    ///
    /// # Errors
    ///
    /// Invalid paths, an empty list, or a destination inside one of the
    /// sources. Individual move failures are reported, not returned.
    pub async fn move_entries(
        &self,
        ctx: &SiteConnectorContext,
        paths: &[String],
        destination: &str,
    ) -> FileManagerResult<MoveReport> {
        let sources = required_paths(paths)?;
        let destination = normalize(destination)?;

        let blocked: HashSet<&str> = sources.iter().map(String::as_str).collect();
        if let Some(hit) = self_and_ancestors(&destination).find(|dir| blocked.contains(dir)) {
            return Err(FileManagerError::MoveIntoSelf {
                moved: hit.to_string(),
                destination: destination.clone(),
            });
        }

        let mut report = MoveReport::default();
        for from in sources {
            let to = join(&destination, file_name(&from))?;
            if to == from {
                debug!(path = %from, "move target equals source, skipping");
                continue;
            }
            match self.connector.move_entry(ctx, &from, &to).await {
                Ok(()) => {
                    self.record_item("move", &from, None);
                    report.moved.push(MovedEntry { from, to });
                }
                Err(err) => {
                    let error = err.detail();
                    self.record_item("move", &from, Some(&error));
                    report.failed.push(MoveFailure { from, to, error });
                }
            }
        }
        info!(
            site_id = ctx.site_id(),
            moved = report.moved.len(),
            failed = report.failed.len(),
            "move batch settled"
        );
        Ok(report)
    }

    /// Copy files into `destination`, renaming on collision.
    pub async fn copy(
        &self,
        ctx: &SiteConnectorContext,
        sources: &[String],
        destination: &str,
        options: &CopyOptions,
    ) -> CopyReport {
        let concurrency = options.concurrency(&self.limits);
        let attempts = options.max_rename_attempts(&self.limits);
        let root = match options.allowed_root.as_deref().map(normalize).transpose() {
            Ok(root) => root.unwrap_or_default(),
            Err(err) => return fail_all_copies(sources, &err.detail()),
        };
        let destination = match normalize(destination)
            .and_then(|dest| assert_within_root(&dest, &root).map(|()| dest))
        {
            Ok(dest) => dest,
            Err(err) => return fail_all_copies(sources, &err.detail()),
        };

        let outcome = run_batch(sources.to_vec(), concurrency, |raw| {
            let destination = destination.as_str();
            let root = root.as_str();
            async move {
                let result = self
                    .copy_one(ctx, &raw, destination, root, attempts)
                    .await
                    .map_err(|err| err.detail());
                self.record_item("copy", &raw, result.as_ref().err().map(String::as_str));
                result
            }
        })
        .await;

        let report = CopyReport {
            ok: outcome.ok,
            failed: outcome
                .failed
                .into_iter()
                .map(|failure| CopyFailure {
                    source: failure.item,
                    error: failure.error,
                })
                .collect(),
        };
        info!(
            site_id = ctx.site_id(),
            copied = report.ok.len(),
            failed = report.failed.len(),
            concurrency,
            "copy batch settled"
        );
        report
    }

    async fn copy_one(
        &self,
        ctx: &SiteConnectorContext,
        raw: &str,
        destination: &str,
        root: &str,
        attempts: u32,
    ) -> FileManagerResult<CopiedEntry> {
        let source = normalize(raw)?;
        assert_within_root(&source, root)?;
        let name = file_name(&source);
        if name.is_empty() {
            return Err(FileManagerError::invalid_input(
                "paths",
                "invalid_source",
                "Invalid source filename",
            ));
        }

        let payload = self.connector.read(ctx, &source).await?;
        let payload = &payload;
        let connector = self.connector.as_ref();
        let placement = place_with_unique_name(destination, name, attempts, |candidate| async move {
            connector.write(ctx, &candidate.path, payload).await
        })
        .await?;

        Ok(CopiedEntry {
            source,
            dest: placement.path,
        })
    }

    /// Delete entries in throttled chunks.
    pub async fn delete(&self, ctx: &SiteConnectorContext, paths: &[String]) -> DeleteReport {
        let outcome = run_chunked(
            paths.to_vec(),
            self.limits.delete_chunk_size,
            self.limits.delete_pause,
            |raw| async move {
                let result = self.delete_one(ctx, &raw).await.map_err(|err| err.detail());
                self.record_item("delete", &raw, result.as_ref().err().map(String::as_str));
                result
            },
        )
        .await;

        let report = DeleteReport {
            deleted: outcome.ok,
            failed: outcome
                .failed
                .into_iter()
                .map(|failure| DeleteFailure {
                    path: failure.item,
                    error: failure.error,
                })
                .collect(),
        };
        info!(
            site_id = ctx.site_id(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "delete batch settled"
        );
        report
    }

    async fn delete_one(&self, ctx: &SiteConnectorContext, raw: &str) -> FileManagerResult<String> {
        let path = normalize(raw)?;
        if path.is_empty() {
            return Err(FileManagerError::invalid_input(
                "paths",
                "invalid_path",
                "The site root cannot be deleted",
            ));
        }
        self.connector.delete(ctx, &path).await?;
        Ok(path)
    }

    /// Upload files into `directory`, renaming on collision.
    ///
    /// # Errors
    ///
    /// An invalid directory. Per-file failures are reported, not returned.
    pub async fn upload(
        &self,
        ctx: &SiteConnectorContext,
        directory: &str,
        files: Vec<UploadFile>,
    ) -> FileManagerResult<UploadReport> {
        let directory = normalize(directory)?;
        let outcome = run_batch(files, self.limits.upload_concurrency, |file| {
            let directory = directory.as_str();
            async move {
                let result = self.upload_one(ctx, directory, file).await;
                self.record_item("upload", &result.name, result.error.as_deref());
                Ok::<_, std::convert::Infallible>(result)
            }
        })
        .await;

        let report = UploadReport::from_results(outcome.ok);
        info!(
            site_id = ctx.site_id(),
            uploaded = report.uploaded,
            failed = report.failed_count.unwrap_or_default(),
            "upload batch settled"
        );
        Ok(report)
    }

    async fn upload_one(
        &self,
        ctx: &SiteConnectorContext,
        directory: &str,
        file: UploadFile,
    ) -> UploadResult {
        let requested = file.file_name.clone();
        let unified = requested.replace('\\', "/");
        let name = file_name(unified.trim_end_matches('/')).trim();
        if name.is_empty() || name == "." || name == ".." {
            return UploadResult::failed(requested, 400, "Invalid file name".to_string());
        }

        let connector = self.connector.as_ref();
        let file = &file;
        let placed = place_with_unique_name(
            directory,
            name,
            self.limits.upload_max_rename_attempts,
            |candidate| async move {
                let upload = UploadFile {
                    file_name: candidate.name,
                    content_type: file.content_type.clone(),
                    data: file.data.clone(),
                };
                connector.upload(ctx, &candidate.path, upload).await
            },
        )
        .await;

        match placed {
            Ok(placement) => UploadResult::saved(requested, placement.name, placement.path),
            Err(PlacementError::Rejected { placement, error }) => UploadResult::failed(
                requested,
                error.status().unwrap_or(502),
                error.detail(),
            )
            .attempted(placement.name, placement.path),
            Err(err @ PlacementError::Exhausted { .. }) => {
                UploadResult::failed(requested, 409, FileManagerError::from(err).detail())
            }
            Err(PlacementError::Invalid(err)) => UploadResult::failed(requested, 400, err.detail()),
        }
    }

    /// Create an archive of `sources` on the connector host.
    ///
    /// Without a target the archive lands next to the first source, named
    /// after the current time.
    ///
    /// # Errors
    ///
    /// Missing or invalid paths and connector failures.
    pub async fn archive(
        &self,
        ctx: &SiteConnectorContext,
        sources: &[String],
        target: Option<&str>,
        format: Option<&str>,
    ) -> FileManagerResult<Value> {
        let sources = required_paths(sources)?;
        let target = match target.map(str::trim).filter(|target| !target.is_empty()) {
            Some(target) => normalize(target)?,
            None => default_archive_target(&sources, Utc::now())?,
        };
        if target.is_empty() {
            return Err(FileManagerError::invalid_input(
                "target",
                "missing_target",
                "An archive target is required",
            ));
        }
        let request = CompressRequest {
            sources,
            target,
            format: Some(format.unwrap_or("zip").to_string()),
        };
        Ok(self.connector.compress(ctx, &request).await?)
    }

    /// Zip `sources` into `directory` under a timestamped name.
    ///
    /// Without a directory the archive lands next to the first source.
    ///
    /// # Errors
    ///
    /// See [`FileManager::archive`].
    pub async fn compress_here(
        &self,
        ctx: &SiteConnectorContext,
        sources: &[String],
        directory: Option<&str>,
    ) -> FileManagerResult<Value> {
        let sources = required_paths(sources)?;
        let now = Utc::now();
        let target = match directory {
            Some(directory) => join(&normalize(directory)?, &archive_name(now))?,
            None => default_archive_target(&sources, now)?,
        };
        info!(site_id = ctx.site_id(), target = %target, "compressing in place");
        self.archive(ctx, &sources, Some(&target), Some("zip")).await
    }

    /// Extract a single archive into `target`.
    ///
    /// # Errors
    ///
    /// `missing_sources`, `multiple_sources` and `missing_target` input
    /// errors, invalid paths, and connector failures.
    pub async fn extract(
        &self,
        ctx: &SiteConnectorContext,
        sources: &[String],
        target: &str,
        format: Option<&str>,
    ) -> FileManagerResult<Value> {
        let given: Vec<&str> = sources
            .iter()
            .map(|source| source.trim())
            .filter(|source| !source.is_empty())
            .collect();
        let source = match given.as_slice() {
            [] => {
                return Err(FileManagerError::invalid_input(
                    "sources",
                    "missing_sources",
                    "An archive to extract is required",
                ));
            }
            [single] => normalize(single)?,
            _ => {
                return Err(FileManagerError::invalid_input(
                    "sources",
                    "multiple_sources",
                    "Only one archive can be extracted at a time",
                ));
            }
        };
        if source.is_empty() {
            return Err(FileManagerError::invalid_input(
                "sources",
                "missing_sources",
                "An archive to extract is required",
            ));
        }
        if target.trim().is_empty() {
            return Err(FileManagerError::invalid_input(
                "target",
                "missing_target",
                "An extraction target is required",
            ));
        }
        let request = DecompressRequest {
            source,
            target: normalize(target)?,
            format: format.map(str::to_string),
        };
        Ok(self.connector.decompress(ctx, &request).await?)
    }

    /// Open a streaming download of a single file, optionally a byte range.
    ///
    /// # Errors
    ///
    /// Invalid paths and connector failures.
    pub async fn download(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        filename: Option<&str>,
        range: Option<&str>,
    ) -> FileManagerResult<RemoteDownload> {
        let path = normalize(path)?;
        Ok(self.connector.download(ctx, &path, filename, range).await?)
    }

    /// Start a zip download of `paths`.
    ///
    /// Validation happens before any remote call; remote failures surface on
    /// the returned stream.
    ///
    /// # Errors
    ///
    /// Empty or invalid path lists and lists longer than the archive limit.
    pub fn download_zip(
        &self,
        ctx: &SiteConnectorContext,
        paths: &[String],
        name: Option<&str>,
    ) -> FileManagerResult<ArchiveDownload> {
        let requested = paths.iter().filter(|path| !path.trim().is_empty()).count();
        if requested > self.limits.archive_max_entries {
            return Err(FileManagerError::ArchiveLimit {
                requested,
                max: self.limits.archive_max_entries,
            });
        }
        let paths = required_paths(paths)?;
        let guard = self.metrics.as_ref().map(Metrics::archive_stream_started);
        info!(site_id = ctx.site_id(), entries = paths.len(), "starting zip download");
        Ok(ArchiveDownload {
            filename: zip_filename(name),
            body: stream_zip(Arc::clone(&self.connector), ctx.clone(), paths, guard),
        })
    }
}

fn required_path(path: &str) -> FileManagerResult<String> {
    let path = normalize(path)?;
    if path.is_empty() {
        return Err(FileManagerError::invalid_input(
            "path",
            "missing_path",
            "A file path is required",
        ));
    }
    Ok(path)
}

/// Normalize a non-empty list of paths, none of which may be the site root.
fn required_paths(paths: &[String]) -> FileManagerResult<Vec<String>> {
    let normalized = paths
        .iter()
        .filter(|path| !path.trim().is_empty())
        .map(|path| normalize(path))
        .collect::<FileManagerResult<Vec<_>>>()?;
    if normalized.is_empty() {
        return Err(FileManagerError::invalid_input(
            "paths",
            "missing_sources",
            "At least one path is required",
        ));
    }
    if normalized.iter().any(String::is_empty) {
        return Err(FileManagerError::invalid_input(
            "paths",
            "invalid_path",
            "The site root cannot be used here",
        ));
    }
    Ok(normalized)
}

fn fail_all_copies(sources: &[String], error: &str) -> CopyReport {
    CopyReport {
        ok: Vec::new(),
        failed: sources
            .iter()
            .map(|source| CopyFailure {
                source: source.clone(),
                error: error.to_string(),
            })
            .collect(),
    }
}

fn archive_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{stamp}.zip")
}

fn default_archive_target(sources: &[String], now: DateTime<Utc>) -> FileManagerResult<String> {
    let directory = sources.first().map_or("", |first| parent(first));
    join(directory, &archive_name(now))
}
