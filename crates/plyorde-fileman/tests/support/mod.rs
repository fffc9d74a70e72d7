//! In-memory connector used by the orchestration tests.
#![allow(dead_code, unreachable_pub)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use plyorde_connector::{
    CompressRequest, ConnectorError, ConnectorResult, DecompressRequest, EntryKind, FileConnector,
    FileEntry, PayloadKind, ReadPayload, RemoteDownload, SiteConnectorContext, UploadFile,
};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use url::Url;

pub fn site() -> Result<SiteConnectorContext, url::ParseError> {
    let base = Url::parse("https://node-1.example.net:8080/")?;
    Ok(SiteConnectorContext::new("site-1", base, "token"))
}

/// Lock `mutex`, recovering the data if a panicking test poisoned it.
fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn status(operation: &'static str, status: u16, message: &str) -> ConnectorError {
    ConnectorError::Status {
        operation,
        status,
        message: message.to_string(),
    }
}

/// Files keyed by normalized path. Writes and uploads refuse to overwrite.
#[derive(Default)]
pub struct MemoryConnector {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<(&'static str, String), VecDeque<ConnectorError>>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    stalled: Mutex<HashMap<String, Arc<AtomicBool>>>,
    compress_requests: Mutex<Vec<CompressRequest>>,
    decompress_requests: Mutex<Vec<DecompressRequest>>,
}

impl MemoryConnector {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn put(&self, path: &str, contents: &[u8]) {
        locked(&self.files).insert(path.to_string(), contents.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        locked(&self.files).get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        locked(&self.files).keys().cloned().collect()
    }

    /// Queue a failure returned by the next `operation` call on `path`.
    pub fn fail(&self, operation: &'static str, path: &str, error: ConnectorError) {
        locked(&self.failures)
            .entry((operation, path.to_string()))
            .or_default()
            .push_back(error);
    }

    /// Make downloads of `path` hang forever; the flag flips once the body
    /// is dropped.
    pub fn stall(&self, path: &str) -> Arc<AtomicBool> {
        let dropped = Arc::new(AtomicBool::new(false));
        locked(&self.stalled).insert(path.to_string(), Arc::clone(&dropped));
        dropped
    }

    pub fn calls(&self, operation: &str) -> Vec<String> {
        locked(&self.calls)
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn compress_requests(&self) -> Vec<CompressRequest> {
        locked(&self.compress_requests).clone()
    }

    pub fn decompress_requests(&self) -> Vec<DecompressRequest> {
        locked(&self.decompress_requests).clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn enter(&self, operation: &'static str, path: &str) -> ConnectorResult<()> {
        locked(&self.calls).push((operation, path.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let queued = locked(&self.failures)
            .get_mut(&(operation, path.to_string()))
            .and_then(VecDeque::pop_front);
        queued.map_or(Ok(()), Err)
    }

    fn store_new(&self, operation: &'static str, path: &str, data: Vec<u8>) -> ConnectorResult<()> {
        let mut files = locked(&self.files);
        if files.contains_key(path) {
            return Err(status(operation, 500, "EEXIST: file exists"));
        }
        files.insert(path.to_string(), data);
        Ok(())
    }

    fn load(&self, operation: &'static str, path: &str) -> ConnectorResult<Vec<u8>> {
        self.contents(path)
            .ok_or_else(|| status(operation, 404, "Not Found"))
    }
}

#[async_trait]
impl FileConnector for MemoryConnector {
    async fn list(
        &self,
        _ctx: &SiteConnectorContext,
        path: &str,
    ) -> ConnectorResult<Vec<FileEntry>> {
        self.enter("list", path).await?;
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        Ok(self
            .paths()
            .into_iter()
            .filter_map(|id| {
                let name = id.strip_prefix(&prefix)?.to_string();
                (!name.contains('/')).then(|| FileEntry {
                    name,
                    kind: EntryKind::File,
                    parent_id: Some(path.to_string()),
                    size: 0,
                    modified_at: None,
                    extension: None,
                    is_archive: None,
                    id,
                })
            })
            .collect())
    }

    async fn read(&self, _ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<ReadPayload> {
        self.enter("read", path).await?;
        let data = self.load("read", path)?;
        Ok(String::from_utf8(data.clone())
            .map_or_else(|_| ReadPayload::from_bytes(&data), ReadPayload::text))
    }

    async fn write(
        &self,
        _ctx: &SiteConnectorContext,
        path: &str,
        payload: &ReadPayload,
    ) -> ConnectorResult<()> {
        self.enter("write", path).await?;
        let data = match payload.kind {
            PayloadKind::Text => payload.content.clone().into_bytes(),
            PayloadKind::Base64 => {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD
                    .decode(&payload.content)
                    .map_err(|_| status("write", 400, "bad base64"))?
            }
        };
        self.store_new("write", path, data)
    }

    async fn mkdir(&self, _ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()> {
        self.enter("mkdir", path).await
    }

    async fn move_entry(
        &self,
        _ctx: &SiteConnectorContext,
        from: &str,
        to: &str,
    ) -> ConnectorResult<()> {
        self.enter("move", from).await?;
        let mut files = locked(&self.files);
        let data = files
            .remove(from)
            .ok_or_else(|| status("move", 404, "Not Found"))?;
        files.insert(to.to_string(), data);
        Ok(())
    }

    async fn delete(&self, _ctx: &SiteConnectorContext, path: &str) -> ConnectorResult<()> {
        self.enter("delete", path).await?;
        locked(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| status("delete", 404, "Not Found"))
    }

    async fn compress(
        &self,
        _ctx: &SiteConnectorContext,
        request: &CompressRequest,
    ) -> ConnectorResult<Value> {
        self.enter("compress", &request.target).await?;
        locked(&self.compress_requests).push(request.clone());
        Ok(json!({"ok": true, "path": request.target}))
    }

    async fn decompress(
        &self,
        _ctx: &SiteConnectorContext,
        request: &DecompressRequest,
    ) -> ConnectorResult<Value> {
        self.enter("decompress", &request.source).await?;
        locked(&self.decompress_requests).push(request.clone());
        Ok(json!({"ok": true}))
    }

    async fn upload(
        &self,
        _ctx: &SiteConnectorContext,
        path: &str,
        file: UploadFile,
    ) -> ConnectorResult<()> {
        self.enter("upload", path).await?;
        if !path.ends_with(&file.file_name) {
            return Err(status("upload", 400, "file name does not match path"));
        }
        self.store_new("upload", path, file.data.to_vec())
    }

    async fn download(
        &self,
        _ctx: &SiteConnectorContext,
        path: &str,
        _filename: Option<&str>,
        _range: Option<&str>,
    ) -> ConnectorResult<RemoteDownload> {
        self.enter("download", path).await?;
        let stalled = locked(&self.stalled).get(path).cloned();
        if let Some(flag) = stalled {
            let body = stream::unfold(DropFlag(flag), |guard| async move {
                std::future::pending::<()>().await;
                Some((Ok(Bytes::new()), guard))
            });
            return Ok(RemoteDownload {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: body.boxed(),
            });
        }
        let data = self.load("download", path)?;
        let chunks: Vec<ConnectorResult<Bytes>> = data
            .chunks(7)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(RemoteDownload {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: stream::iter(chunks).boxed(),
        })
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
