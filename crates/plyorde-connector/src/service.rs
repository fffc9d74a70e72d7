//! Abstraction over the remote file-manager API.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::SiteConnectorContext;
use crate::error::ConnectorResult;
use crate::model::{CompressRequest, DecompressRequest, FileEntry, RemoteDownload, UploadFile};
use crate::payload::ReadPayload;

/// Typed operations of a connector's file-manager API.
///
/// Paths are relative to the site root and already normalized by the caller.
#[async_trait]
pub trait FileConnector: Send + Sync {
    /// List the entries of a directory.
    async fn list(&self, ctx: &SiteConnectorContext, path: &str)
    -> ConnectorResult<Vec<FileEntry>>;

    /// Read a file and classify its contents.
    async fn read(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<ReadPayload>;

    /// Create or overwrite a file.
    async fn write(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        payload: &ReadPayload,
    ) -> ConnectorResult<()>;

    /// Create a directory.
    async fn mkdir(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()>;

    /// Move or rename an entry.
    async fn move_entry(
        &self,
        ctx: &SiteConnectorContext,
        from: &str,
        to: &str,
    ) -> ConnectorResult<()>;

    /// Delete a single entry.
    async fn delete(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()>;

    /// Create an archive on the connector host.
    async fn compress(
        &self,
        ctx: &SiteConnectorContext,
        request: &CompressRequest,
    ) -> ConnectorResult<Value>;

    /// Extract an archive on the connector host.
    async fn decompress(
        &self,
        ctx: &SiteConnectorContext,
        request: &DecompressRequest,
    ) -> ConnectorResult<Value>;

    /// Upload a file to `path` (the full destination path).
    async fn upload(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        file: UploadFile,
    ) -> ConnectorResult<()>;

    /// Open a streaming download; `range` is forwarded as the `Range` header.
    async fn download(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        filename: Option<&str>,
        range: Option<&str>,
    ) -> ConnectorResult<RemoteDownload>;
}
