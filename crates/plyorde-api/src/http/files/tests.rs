use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, RANGE},
    },
    response::Response,
};
use httpmock::prelude::*;
use plyorde_config::{AccessError, ApiCredential, Permission};
use plyorde_connector::{ConnectorClient, ConnectorTimeouts, SiteConnectorContext};
use plyorde_fileman::{FileManager, FileManagerLimits};
use plyorde_telemetry::Metrics;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use crate::http::constants::HEADER_API_KEY;
use crate::http::router::ApiServer;
use crate::state::{ApiState, SiteResolver};

const SITE: &str = "site-1";
const TOKEN: &str = "connector-token";
const OPERATOR: &str = "ops:secret";
const VIEWER: &str = "viewer:secret";

/// Grants `ops` everything and `viewer` read and download on one site.
struct StubResolver {
    base_url: Url,
}

#[async_trait]
impl SiteResolver for StubResolver {
    async fn resolve(
        &self,
        credential: &ApiCredential,
        site_id: &str,
        permission: Permission,
    ) -> Result<SiteConnectorContext, AccessError> {
        if site_id != SITE {
            return Err(AccessError::NotFound {
                site_id: site_id.to_string(),
            });
        }
        let allowed = match credential.key_id() {
            "ops" => true,
            "viewer" => matches!(permission, Permission::Read | Permission::Download),
            _ => return Err(AccessError::Unauthorized),
        };
        if !allowed {
            return Err(AccessError::Forbidden {
                site_id: site_id.to_string(),
            });
        }
        Ok(SiteConnectorContext::new(
            SITE,
            self.base_url.clone(),
            TOKEN,
        ))
    }
}

fn server_for(connector: &MockServer) -> Result<ApiServer> {
    let metrics = Metrics::new()?;
    let client =
        ConnectorClient::new(ConnectorTimeouts::default())?.with_metrics(metrics.clone());
    let files = FileManager::new(Arc::new(client), FileManagerLimits::default())
        .with_metrics(metrics.clone());
    let resolver = StubResolver {
        base_url: Url::parse(&connector.base_url())?,
    };
    Ok(ApiServer::new(ApiState::new(
        files,
        Arc::new(resolver),
        metrics,
    )))
}

fn files_uri(action: &str) -> String {
    format!("/v1/sites/{SITE}/files/{action}")
}

fn get(uri: &str, key: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .uri(uri)
        .header(HEADER_API_KEY, key)
        .body(Body::empty())?)
}

fn post_json(uri: &str, key: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(HEADER_API_KEY, key)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn post_form(uri: &str, key: &str, body: &'static str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(HEADER_API_KEY, key)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))?)
}

async fn send(server: &ApiServer, request: Request<Body>) -> Result<Response> {
    Ok(server.router().clone().oneshot(request).await?)
}

async fn json_of(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await?["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn file_routes_require_a_credential() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;

    let request = Request::builder()
        .uri(files_uri("list"))
        .body(Body::empty())?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&server, get(&files_uri("list"), "no-secret")?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn permissions_are_checked_per_operation() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        post_json(&files_uri("delete"), VIEWER, &json!({"paths": ["a.txt"]}))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&server, get("/v1/sites/other/files/list", OPERATOR)?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_forwards_to_the_site_connector() -> Result<()> {
    let connector = MockServer::start_async().await;
    let list = connector
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/filemanager/site-1/list")
                .query_param("path", "wp-content")
                .header("authorization", "Bearer connector-token");
            then.status(200).json_body(json!({
                "entries": [
                    {"id": "wp-content/themes", "name": "themes", "kind": "folder", "size": 0}
                ]
            }));
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(&server, get(&files_uri("list?path=/wp-content/"), VIEWER)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await?;
    assert_eq!(body["entries"][0]["name"], "themes");
    list.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn traversal_is_rejected_before_any_remote_call() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;

    let response = send(&server, get(&files_uri("list?path=../etc"), OPERATOR)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/problem+json");
    let body = json_of(response).await?;
    assert_eq!(body["code"], "invalid_path");
    assert_eq!(body["status"], 400);
    Ok(())
}

#[tokio::test]
async fn unknown_actions_are_bad_requests() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let response = send(
        &server,
        post_json(&files_uri("actions"), OPERATOR, &json!({"action": "explode"}))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await?["code"], "invalid_body");
    Ok(())
}

#[tokio::test]
async fn actions_endpoint_dispatches_by_tag() -> Result<()> {
    let connector = MockServer::start_async().await;
    connector
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/filemanager/site-1/read")
                .query_param("path", "readme.txt");
            then.status(200)
                .header("content-type", "text/plain")
                .body("hello");
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        post_json(
            &files_uri("actions"),
            VIEWER,
            &json!({"action": "read", "path": "readme.txt"}),
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await?;
    assert_eq!(body["kind"], "text");
    assert_eq!(body["content"], "hello");
    Ok(())
}

#[tokio::test]
async fn partial_delete_reports_each_path() -> Result<()> {
    let connector = MockServer::start_async().await;
    connector
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/filemanager/site-1/delete")
                .query_param("path", "a.txt");
            then.status(200);
        })
        .await;
    connector
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/filemanager/site-1/delete")
                .query_param("path", "b.txt");
            then.status(404).json_body(json!({"error": "Not Found"}));
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        post_json(
            &files_uri("delete"),
            OPERATOR,
            &json!({"paths": ["a.txt", "b.txt"]}),
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_of(response).await?;
    assert_eq!(body["ok"], false);
    assert_eq!(body["deleted"], json!(["a.txt"]));
    assert_eq!(body["failed"][0]["path"], "b.txt");
    assert_eq!(body["failed"][0]["error"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn extract_accepts_form_bodies_with_json_sources() -> Result<()> {
    let connector = MockServer::start_async().await;
    let decompress = connector
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/filemanager/site-1/decompress")
                .json_body(json!({"source": "backups/site.zip", "target": "restore"}));
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;
    let server = server_for(&connector)?;

    let request = Request::builder()
        .method("POST")
        .uri(files_uri("extract"))
        .header(HEADER_API_KEY, OPERATOR)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "sources=%5B%22backups%2Fsite.zip%22%5D&target=restore",
        ))?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await?, json!({"ok": true}));
    decompress.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn extract_rejects_repeated_form_sources() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let response = send(
        &server,
        post_form(
            &files_uri("extract"),
            OPERATOR,
            "sources=a.zip&sources=b.zip&target=restore",
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await?["code"], "multiple_sources");
    Ok(())
}

#[tokio::test]
async fn compress_here_accepts_form_ids() -> Result<()> {
    let connector = MockServer::start_async().await;
    let compress = connector
        .mock_async(|when, then| {
            when.method(POST).path("/api/filemanager/site-1/compress");
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        post_form(
            &files_uri("compress-here"),
            OPERATOR,
            "ids=wp-content%2Fa.txt&ids=wp-content%2Fb.txt&parentId=wp-content",
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await?, json!({"ok": true}));
    compress.assert_async().await;

    let response = send(
        &server,
        post_form(&files_uri("compress-here"), VIEWER, "ids=a.txt")?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn extract_without_target_is_rejected() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let response = send(
        &server,
        post_json(
            &files_uri("extract"),
            OPERATOR,
            &json!({"sources": ["backups/site.zip"]}),
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await?["code"], "missing_target");
    Ok(())
}

#[tokio::test]
async fn multipart_upload_reports_saved_names() -> Result<()> {
    let connector = MockServer::start_async().await;
    let upload = connector
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/filemanager/site-1/upload")
                .query_param("path", "wp-content/uploads/notes.txt");
            then.status(200);
        })
        .await;
    let server = server_for(&connector)?;

    let boundary = "plyorde-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         remember the milk\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri(files_uri("upload?path=wp-content/uploads"))
        .header(HEADER_API_KEY, OPERATOR)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_of(response).await?;
    assert_eq!(report["ok"], true);
    assert_eq!(report["uploaded"], 1);
    assert_eq!(report["results"][0]["savedAs"], "notes.txt");
    upload.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn upload_without_files_is_rejected() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let boundary = "plyorde-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"note\"\r\n\r\n\
         nothing here\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri(files_uri("upload"))
        .header(HEADER_API_KEY, OPERATOR)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await?["code"], "missing_files");
    Ok(())
}

#[tokio::test]
async fn download_passes_connector_headers_through() -> Result<()> {
    let connector = MockServer::start_async().await;
    connector
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/filemanager/site-1/download")
                .query_param("path", "backups/db.sql");
            then.status(200)
                .header("content-type", "application/sql")
                .header("content-disposition", "attachment; filename=\"db.sql\"")
                .body("select 1;");
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        get(&files_uri("download?path=backups/db.sql"), VIEWER)?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/sql");
    assert_eq!(headers["content-disposition"], "attachment; filename=\"db.sql\"");
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(headers["x-accel-buffering"], "no");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"select 1;");
    Ok(())
}

#[tokio::test]
async fn download_forwards_range_requests() -> Result<()> {
    let connector = MockServer::start_async().await;
    let ranged = connector
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/filemanager/site-1/download")
                .query_param("path", "backups/db.sql")
                .header("range", "bytes=0-3");
            then.status(206)
                .header("accept-ranges", "bytes")
                .header("content-range", "bytes 0-3/9")
                .body("sele");
        })
        .await;
    let server = server_for(&connector)?;

    let request = Request::builder()
        .uri(files_uri("download?path=backups/db.sql"))
        .header(HEADER_API_KEY, VIEWER)
        .header(RANGE, "bytes=0-3")
        .body(Body::empty())?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 0-3/9");
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"sele");
    ranged.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn connector_errors_keep_their_status() -> Result<()> {
    let connector = MockServer::start_async().await;
    connector
        .mock_async(|when, then| {
            when.method(GET).path("/api/filemanager/site-1/read");
            then.status(404).json_body(json!({"error": "Not Found"}));
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(&server, get(&files_uri("read?path=missing.txt"), VIEWER)?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_of(response).await?;
    assert_eq!(body["code"], "connector_error");
    assert_eq!(body["detail"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn zip_download_streams_an_archive() -> Result<()> {
    let connector = MockServer::start_async().await;
    connector
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/filemanager/site-1/download")
                .query_param("path", "wp-config.php");
            then.status(200).body("<?php // config");
        })
        .await;
    let server = server_for(&connector)?;

    let response = send(
        &server,
        get(
            &files_uri("download-zip?paths=wp-config.php&name=site%20backup"),
            VIEWER,
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/zip");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"site backup.zip\""
    );
    assert_eq!(headers["x-accel-buffering"], "no");
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(body.starts_with(b"PK"));
    Ok(())
}

#[tokio::test]
async fn zip_download_accepts_form_posts() -> Result<()> {
    let connector = MockServer::start_async().await;
    for (path, body) in [("wp-config.php", "<?php"), ("readme.txt", "hello")] {
        connector
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/filemanager/site-1/download")
                    .query_param("path", path);
                then.status(200).body(body);
            })
            .await;
    }
    let server = server_for(&connector)?;

    let response = send(
        &server,
        post_form(
            &files_uri("download-zip"),
            VIEWER,
            "paths=wp-config.php&paths=readme.txt&name=bundle",
        )?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"bundle.zip\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(body.starts_with(b"PK"));
    Ok(())
}

#[tokio::test]
async fn zip_download_requires_paths() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let response = send(
        &server,
        post_json(&files_uri("download-zip"), VIEWER, &json!({"paths": []}))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn metrics_count_matched_routes() -> Result<()> {
    let connector = MockServer::start_async().await;
    let server = server_for(&connector)?;
    let request = Request::builder().uri("/health").body(Body::empty())?;
    send(&server, request).await?;
    let response = send(
        &server,
        post_json(&files_uri("delete"), VIEWER, &json!({"paths": ["a.txt"]}))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder().uri("/metrics").body(Body::empty())?;
    let response = send(&server, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(body.to_vec())?;
    let health_line = text
        .lines()
        .find(|line| line.starts_with("http_requests_total") && line.contains("route=\"/health\""));
    assert!(health_line.is_some_and(|line| {
        line.contains("code=\"200\"") && line.contains("action=\"none\"") && line.ends_with(" 1")
    }));
    let delete_line = text.lines().find(|line| {
        line.starts_with("http_requests_total") && line.contains("route=\"/v1/sites/{site_id}/files/delete\"")
    });
    assert!(delete_line.is_some_and(|line| {
        line.contains("action=\"delete\"") && line.contains("code=\"403\"")
    }));
    Ok(())
}
