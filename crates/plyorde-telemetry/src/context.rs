//! Per-request scope for logs emitted below the HTTP layer.
//!
//! # Design
//! - The HTTP layer opens a [`RequestScope`] holding the request id, matched
//!   route and site; connector and orchestrator logs read it back from
//!   task-local storage.
//! - Handlers name the file action once via [`record_file_action`]; the
//!   HTTP layer reads it after the response to label its counter.
//! - Batch workers run on the request task, so they share the scope.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tracing::Span;

/// Span field that carries the file action.
pub const FILE_ACTION_FIELD: &str = "file_action";

/// Identity of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestScope {
    request_id: Arc<str>,
    route: Arc<str>,
    site_id: Option<Arc<str>>,
    action: Arc<OnceLock<&'static str>>,
}

impl RequestScope {
    /// Scope for a request matched to `route`.
    #[must_use]
    pub fn new(request_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            route: Arc::from(route.into()),
            site_id: None,
            action: Arc::new(OnceLock::new()),
        }
    }

    /// Attach the site addressed by the request.
    #[must_use]
    pub fn with_site(mut self, site_id: Option<&str>) -> Self {
        self.site_id = site_id.filter(|id| !id.is_empty()).map(Arc::from);
        self
    }

    /// File action recorded by the handler, if it ran one.
    #[must_use]
    pub fn file_action(&self) -> Option<&'static str> {
        self.action.get().copied()
    }

    /// Run `fut` with this scope visible to [`current_request_id`] and friends.
    pub async fn run<Fut>(self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        ACTIVE_SCOPE.scope(self, fut).await
    }
}

/// Request id of the running request, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_SCOPE
        .try_with(|scope| scope.request_id.to_string())
        .ok()
}

/// Matched route of the running request, if any.
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_SCOPE.try_with(|scope| scope.route.to_string()).ok()
}

/// Site addressed by the running request, if any.
#[must_use]
pub fn current_site_id() -> Option<String> {
    ACTIVE_SCOPE
        .try_with(|scope| scope.site_id.as_deref().map(str::to_string))
        .ok()
        .flatten()
}

/// Name the file action served by the running request.
///
/// The first call wins. The action is also recorded on the current span.
pub fn record_file_action(action: &'static str) {
    let _ = ACTIVE_SCOPE.try_with(|scope| scope.action.set(action));
    Span::current().record(FILE_ACTION_FIELD, action);
}

tokio::task_local! {
    static ACTIVE_SCOPE: RequestScope;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_is_visible_inside_and_gone_outside() {
        let scope = RequestScope::new("req-42", "/v1/sites/{site_id}/files/copy")
            .with_site(Some("blog"));
        let handle = scope.clone();
        let output = scope
            .run(async {
                assert_eq!(current_request_id().as_deref(), Some("req-42"));
                assert_eq!(
                    current_route().as_deref(),
                    Some("/v1/sites/{site_id}/files/copy")
                );
                assert_eq!(current_site_id().as_deref(), Some("blog"));
                record_file_action("copy");
                record_file_action("delete");
                "done"
            })
            .await;
        assert_eq!(output, "done");
        assert_eq!(handle.file_action(), Some("copy"));
        assert!(current_request_id().is_none());
        assert!(current_site_id().is_none());
    }

    #[tokio::test]
    async fn empty_site_ids_are_dropped() {
        let scope = RequestScope::new("req-1", "/health").with_site(Some(""));
        scope
            .run(async {
                assert!(current_site_id().is_none());
            })
            .await;
        record_file_action("list");
    }
}
