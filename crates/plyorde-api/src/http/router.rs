//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use plyorde_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::http::auth::require_credential;
use crate::http::constants::{HEADER_API_KEY, HEADER_REQUEST_ID, MAX_UPLOAD_BYTES};
use crate::http::files::handlers::{
    archive_entries, compress_here, copy_entries, create_file, create_folder, delete_entries,
    extract_archive, list_files, move_entries, read_file, rename_entry, run_action, write_file,
};
use crate::http::files::transfer::{
    download_file, download_zip_get, download_zip_post, upload_files,
};
use crate::http::health::{health, metrics};
use crate::http::telemetry::{RequestScopeLayer, matched_route, request_id, site_id_from_path};
use crate::state::ApiState;

const FILES_PREFIX: &str = "/v1/sites/{site_id}/files";

/// Axum router wrapper that hosts the file-manager API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router with its middleware stack around `state`.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let telemetry = state.telemetry.clone();
        let state = Arc::new(state);

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                AUTHORIZATION,
                HeaderName::from_static(HEADER_API_KEY),
                HeaderName::from_static(HEADER_REQUEST_ID),
            ]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %matched_route(request),
                    request_id = %request_id(request),
                    site_id = site_id_from_path(request.uri().path()).unwrap_or_default(),
                    file_action = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(plyorde_telemetry::propagate_request_id_layer())
            .layer(plyorde_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(RequestScopeLayer::new(telemetry));

        let router = Self::public_routes()
            .nest(FILES_PREFIX, Self::file_routes())
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn file_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/list", get(list_files))
            .route("/read", get(read_file))
            .route("/write", post(write_file))
            .route("/create-file", post(create_file))
            .route("/create-folder", post(create_folder))
            .route("/rename", post(rename_entry))
            .route("/move", post(move_entries))
            .route("/copy", post(copy_entries))
            .route("/delete", post(delete_entries))
            .route(
                "/upload",
                post(upload_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .route("/download", get(download_file))
            .route(
                "/download-zip",
                get(download_zip_get).post(download_zip_post),
            )
            .route("/archive", post(archive_entries))
            .route("/compress-here", post(compress_here))
            .route("/extract", post(extract_archive))
            .route("/actions", post(run_action))
            .route_layer(middleware::from_fn(require_credential))
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
