//! Streaming zip downloads.
//!
//! # Design
//! - Entries are fetched one at a time and piped through the zip writer into
//!   an in-memory duplex; the response body reads the other end, so memory
//!   use stays bounded by the pipe capacity.
//! - The writer runs on its own task. A failure mid-archive surfaces as an
//!   error item at the end of the byte stream, which aborts the response.
//! - Dropping the body aborts the writer task and with it the in-flight
//!   connector download.

use std::io;
use std::sync::Arc;

use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use bytes::Bytes;
use futures_util::io::AsyncWriteExt;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use plyorde_connector::{FileConnector, SiteConnectorContext};
use plyorde_telemetry::ArchiveStreamGuard;
use tokio::io::AsyncWrite;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::{FileManagerError, FileManagerResult};
use crate::path::sanitize_zip_entry_name;

const PIPE_CAPACITY: usize = 64 * 1024;
const DEFAULT_ZIP_NAME: &str = "download.zip";

/// A zip archive being streamed to the caller.
pub struct ArchiveDownload {
    /// Sanitized attachment name ending in `.zip`.
    pub filename: String,
    /// Archive bytes.
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for ArchiveDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDownload")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Attachment name for a zip download.
///
/// Quotes, backslashes, slashes and control characters are removed; an empty
/// result falls back to `download.zip` and `.zip` is appended when missing.
#[must_use]
pub fn zip_filename(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return DEFAULT_ZIP_NAME.to_string();
    }
    if cleaned.to_ascii_lowercase().ends_with(".zip") {
        cleaned.to_string()
    } else {
        format!("{cleaned}.zip")
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Stream a zip of `paths`, fetched sequentially from the connector.
///
/// Must be called from within a Tokio runtime.
pub fn stream_zip(
    connector: Arc<dyn FileConnector>,
    ctx: SiteConnectorContext,
    paths: Vec<String>,
    guard: Option<ArchiveStreamGuard>,
) -> BoxStream<'static, io::Result<Bytes>> {
    let (sink, source) = tokio::io::duplex(PIPE_CAPACITY);
    let (done_tx, done_rx) = oneshot::channel();

    let writer = tokio::spawn(async move {
        let result = write_archive(connector.as_ref(), &ctx, &paths, sink).await;
        match &result {
            Ok(()) => debug!(site_id = ctx.site_id(), entries = paths.len(), "zip stream finished"),
            Err(err) => warn!(
                site_id = ctx.site_id(),
                error = %err,
                detail = %err.detail(),
                "zip stream aborted"
            ),
        }
        let _ = done_tx.send(result);
    });
    let abort = AbortOnDrop(writer);

    async_stream::stream! {
        let _abort = abort;
        let _guard = guard;
        let mut chunks = ReaderStream::new(source);
        while let Some(chunk) = chunks.next().await {
            yield chunk;
        }
        match done_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => yield Err(io::Error::other(err)),
            Err(_) => yield Err(io::Error::other("zip writer stopped unexpectedly")),
        }
    }
    .boxed()
}

async fn write_archive<W>(
    connector: &dyn FileConnector,
    ctx: &SiteConnectorContext,
    paths: &[String],
    sink: W,
) -> FileManagerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = ZipFileWriter::with_tokio(sink);
    for path in paths {
        let download = connector.download(ctx, path, None, None).await?;
        let entry_name = sanitize_zip_entry_name(path);
        debug!(site_id = ctx.site_id(), entry = %entry_name, "adding zip entry");

        let builder = ZipEntryBuilder::new(entry_name.into(), Compression::Deflate)
            .deflate_option(DeflateOption::Maximum);
        let mut entry = writer
            .write_entry_stream(builder)
            .await
            .map_err(|source| FileManagerError::Archive {
                operation: "open_entry",
                source,
            })?;

        let mut body = download.body;
        while let Some(chunk) = body.try_next().await? {
            entry
                .write_all(&chunk)
                .await
                .map_err(|source| FileManagerError::Io {
                    operation: "write_entry",
                    source,
                })?;
        }
        entry.close().await.map_err(|source| FileManagerError::Archive {
            operation: "close_entry",
            source,
        })?;
    }
    writer
        .close()
        .await
        .map_err(|source| FileManagerError::Archive {
            operation: "finish",
            source,
        })?;
    Ok(())
}
