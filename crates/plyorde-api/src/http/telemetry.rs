//! Request scope and request counting around every route.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;
use plyorde_telemetry::{Metrics, RequestScope};
use tower::{Layer, Service};

use crate::http::constants::HEADER_REQUEST_ID;

const SITES_PREFIX: &str = "/v1/sites/";
const UNMATCHED_ROUTE: &str = "unmatched";

/// Site id addressed by a file route path.
pub(crate) fn site_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(SITES_PREFIX)
        .and_then(|rest| rest.split('/').next())
        .filter(|site_id| !site_id.is_empty())
}

pub(crate) fn matched_route<B>(request: &Request<B>) -> &str {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
}

pub(crate) fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Opens a [`RequestScope`] for the handler and counts the response by
/// route, file action and status.
#[derive(Clone)]
pub(crate) struct RequestScopeLayer {
    metrics: Metrics,
}

impl RequestScopeLayer {
    pub(crate) const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for RequestScopeLayer {
    type Service = RequestScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestScopeService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RequestScopeService<S> {
    inner: S,
    metrics: Metrics,
}

impl<S, B> Service<Request<B>> for RequestScopeService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let route = matched_route(&request).to_string();
        let scope = RequestScope::new(request_id(&request), route.clone())
            .with_site(site_id_from_path(request.uri().path()));
        let handle = scope.clone();
        let metrics = self.metrics.clone();
        let fut = self.inner.call(request);

        Box::pin(scope.run(async move {
            let response = fut.await?;
            metrics.inc_http_request(&route, handle.file_action(), response.status().as_u16());
            Ok(response)
        }))
    }
}
