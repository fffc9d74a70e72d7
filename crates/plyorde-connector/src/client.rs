//! reqwest-backed implementation of [`FileConnector`].
//!
//! # Design
//! - One shared `reqwest::Client`; per-call timeouts come from the operation
//!   table so streaming transfers stay unbounded.
//! - Every response passes through [`ConnectorClient::send`], the only place
//!   that turns HTTP outcomes into [`ConnectorError`] and records metrics.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use plyorde_telemetry::{Metrics, Outcome, current_request_id};
use reqwest::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap,
    HeaderName, RANGE,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::context::SiteConnectorContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::model::{
    CompressRequest, DecompressRequest, FileEntry, ListResponse, MkdirRequest, MoveRequest,
    RemoteDownload, UploadFile,
};
use crate::operation::{ConnectorOp, ConnectorTimeouts};
use crate::payload::{ReadPayload, build_write_request, detect};
use crate::service::FileConnector;

const ROOT_PATH: &str = "/";
const OCTET_STREAM: &str = "application/octet-stream";
const UPLOAD_FIELD: &str = "file";
const PASSTHROUGH_HEADERS: [HeaderName; 5] = [
    CONTENT_TYPE,
    CONTENT_LENGTH,
    CONTENT_DISPOSITION,
    ACCEPT_RANGES,
    CONTENT_RANGE,
];

/// HTTP client for connector file-manager endpoints.
#[derive(Clone)]
pub struct ConnectorClient {
    http: Client,
    timeouts: ConnectorTimeouts,
    metrics: Option<Metrics>,
}

impl ConnectorClient {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Request`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeouts: ConnectorTimeouts) -> ConnectorResult<Self> {
        let http = Client::builder()
            .connect_timeout(timeouts.metadata)
            .build()
            .map_err(|source| ConnectorError::Request {
                operation: "client",
                source,
            })?;
        Ok(Self::with_client(http, timeouts))
    }

    /// Wrap an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(http: Client, timeouts: ConnectorTimeouts) -> Self {
        Self {
            http,
            timeouts,
            metrics: None,
        }
    }

    /// Record call counts and latency into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Timeouts in effect.
    #[must_use]
    pub const fn timeouts(&self) -> ConnectorTimeouts {
        self.timeouts
    }

    fn endpoint(
        ctx: &SiteConnectorContext,
        op: ConnectorOp,
        path: Option<&str>,
    ) -> ConnectorResult<Url> {
        let mut url = ctx.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| ConnectorError::InvalidUrl {
                operation: op.name(),
                base_url: ctx.base_url().to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "filemanager", ctx.site_id(), op.segment()]);
        if let Some(path) = path {
            url.query_pairs_mut().append_pair("path", path);
        }
        Ok(url)
    }

    fn request(&self, ctx: &SiteConnectorContext, op: ConnectorOp, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(op.method(), url)
            .bearer_auth(ctx.token());
        match op.timeout(&self.timeouts) {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    async fn send(
        &self,
        ctx: &SiteConnectorContext,
        op: ConnectorOp,
        builder: RequestBuilder,
    ) -> ConnectorResult<Response> {
        let started = Instant::now();
        let result = builder.send().await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    site_id = ctx.site_id(),
                    operation = op.name(),
                    status = response.status().as_u16(),
                    elapsed_ms = elapsed.as_millis(),
                    "connector call succeeded"
                );
                self.observe(op, Outcome::Success, elapsed);
                Ok(response)
            }
            Ok(response) => {
                let status = response.status();
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(source) => {
                        debug!(
                            site_id = ctx.site_id(),
                            operation = op.name(),
                            error = %source,
                            "connector error body unreadable; using status text"
                        );
                        Bytes::new()
                    }
                };
                let err = ConnectorError::from_response(op.name(), status, &body);
                debug!(
                    request_id = current_request_id().as_deref().unwrap_or("-"),
                    site_id = ctx.site_id(),
                    operation = op.name(),
                    status = status.as_u16(),
                    detail = %err.detail(),
                    "connector call rejected"
                );
                self.observe(op, Outcome::Failure, elapsed);
                Err(err)
            }
            Err(source) => {
                warn!(
                    request_id = current_request_id().as_deref().unwrap_or("-"),
                    site_id = ctx.site_id(),
                    operation = op.name(),
                    error = %source,
                    "connector unreachable"
                );
                self.observe(op, Outcome::Failure, elapsed);
                Err(ConnectorError::Unreachable {
                    operation: op.name(),
                    source,
                })
            }
        }
    }

    fn observe(&self, op: ConnectorOp, outcome: Outcome, elapsed: std::time::Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_connector_call(op.name(), outcome, elapsed);
        }
    }

    async fn body_bytes(op: ConnectorOp, response: Response) -> ConnectorResult<Bytes> {
        response
            .bytes()
            .await
            .map_err(|source| ConnectorError::Unreachable {
                operation: op.name(),
                source,
            })
    }

    async fn json_body(op: ConnectorOp, response: Response) -> ConnectorResult<Value> {
        let body = Self::body_bytes(op, response).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|source| ConnectorError::Decode {
            operation: op.name(),
            source,
        })
    }
}

fn or_root(path: &str) -> &str {
    if path.is_empty() { ROOT_PATH } else { path }
}

fn upload_part(file: &UploadFile) -> reqwest::Result<Part> {
    let length = u64::try_from(file.data.len()).unwrap_or(u64::MAX);
    let part = || {
        Part::stream_with_length(file.data.clone(), length).file_name(file.file_name.clone())
    };
    let declared = file
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match declared.map(|content_type| part().mime_str(content_type)) {
        Some(Ok(part)) => Ok(part),
        _ => part().mime_str(OCTET_STREAM),
    }
}

#[async_trait]
impl FileConnector for ConnectorClient {
    async fn list(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
    ) -> ConnectorResult<Vec<FileEntry>> {
        let op = ConnectorOp::List;
        let url = Self::endpoint(ctx, op, Some(or_root(path)))?;
        let response = self.send(ctx, op, self.request(ctx, op, url)).await?;
        let body = Self::body_bytes(op, response).await?;
        let listing: ListResponse =
            serde_json::from_slice(&body).map_err(|source| ConnectorError::Decode {
                operation: op.name(),
                source,
            })?;
        Ok(listing.entries)
    }

    async fn read(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<ReadPayload> {
        let op = ConnectorOp::Read;
        let url = Self::endpoint(ctx, op, Some(or_root(path)))?;
        let response = self.send(ctx, op, self.request(ctx, op, url)).await?;
        let headers = response.headers().clone();
        let body = Self::body_bytes(op, response).await?;
        Ok(detect(&body, &headers))
    }

    async fn write(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        payload: &ReadPayload,
    ) -> ConnectorResult<()> {
        let op = ConnectorOp::Write;
        let url = Self::endpoint(ctx, op, Some(path))?;
        let request = build_write_request(payload);
        let builder = self
            .request(ctx, op, url)
            .header(CONTENT_TYPE, request.content_type)
            .body(request.body);
        self.send(ctx, op, builder).await?;
        Ok(())
    }

    async fn mkdir(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()> {
        let op = ConnectorOp::Mkdir;
        let url = Self::endpoint(ctx, op, None)?;
        let builder = self.request(ctx, op, url).json(&MkdirRequest { path });
        self.send(ctx, op, builder).await?;
        Ok(())
    }

    async fn move_entry(
        &self,
        ctx: &SiteConnectorContext,
        from: &str,
        to: &str,
    ) -> ConnectorResult<()> {
        let op = ConnectorOp::Move;
        let url = Self::endpoint(ctx, op, None)?;
        let builder = self.request(ctx, op, url).json(&MoveRequest { from, to });
        self.send(ctx, op, builder).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()> {
        let op = ConnectorOp::Delete;
        let url = Self::endpoint(ctx, op, Some(path))?;
        self.send(ctx, op, self.request(ctx, op, url)).await?;
        Ok(())
    }

    async fn compress(
        &self,
        ctx: &SiteConnectorContext,
        request: &CompressRequest,
    ) -> ConnectorResult<Value> {
        let op = ConnectorOp::Compress;
        let url = Self::endpoint(ctx, op, None)?;
        let response = self
            .send(ctx, op, self.request(ctx, op, url).json(request))
            .await?;
        Self::json_body(op, response).await
    }

    async fn decompress(
        &self,
        ctx: &SiteConnectorContext,
        request: &DecompressRequest,
    ) -> ConnectorResult<Value> {
        let op = ConnectorOp::Decompress;
        let url = Self::endpoint(ctx, op, None)?;
        let response = self
            .send(ctx, op, self.request(ctx, op, url).json(request))
            .await?;
        Self::json_body(op, response).await
    }

    async fn upload(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        file: UploadFile,
    ) -> ConnectorResult<()> {
        let op = ConnectorOp::Upload;
        let url = Self::endpoint(ctx, op, Some(path))?;
        let part = upload_part(&file).map_err(|source| ConnectorError::Request {
            operation: op.name(),
            source,
        })?;
        let builder = self
            .request(ctx, op, url)
            .multipart(Form::new().part(UPLOAD_FIELD, part));
        self.send(ctx, op, builder).await?;
        Ok(())
    }

    async fn download(
        &self,
        ctx: &SiteConnectorContext,
        path: &str,
        filename: Option<&str>,
        range: Option<&str>,
    ) -> ConnectorResult<RemoteDownload> {
        let op = ConnectorOp::Download;
        let mut url = Self::endpoint(ctx, op, Some(or_root(path)))?;
        if let Some(name) = filename.map(str::trim).filter(|name| !name.is_empty()) {
            url.query_pairs_mut().append_pair("filename", name);
        }
        let mut builder = self.request(ctx, op, url);
        if let Some(range) = range.map(str::trim).filter(|range| !range.is_empty()) {
            builder = builder.header(RANGE, range);
        }
        let response = self.send(ctx, op, builder).await?;

        let status = response.status();
        let mut headers = HeaderMap::new();
        for name in PASSTHROUGH_HEADERS {
            if let Some(value) = response.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        let body = response
            .bytes_stream()
            .map_err(move |source| ConnectorError::Unreachable {
                operation: op.name(),
                source,
            })
            .boxed();

        Ok(RemoteDownload {
            status,
            headers,
            body,
        })
    }
}
