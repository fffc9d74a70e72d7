//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Collector registration is encapsulated so callers only see typed
//!   increment helpers.
//! - Covers the three traffic shapes of the service: inbound HTTP, outbound
//!   connector calls, and per-item batch outcomes.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Outcome label attached to connector and batch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Failure,
}

impl Outcome {
    /// Label value used in exported series.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    connector_requests_total: IntCounterVec,
    connector_request_duration_seconds: HistogramVec,
    batch_items_total: IntCounterVec,
    connector_failures_total: IntCounter,
    batch_item_failures_total: IntCounter,
    archive_streams_active: IntGauge,
}

/// Snapshot of selected series for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Archive downloads currently streaming to clients.
    pub archive_streams_active: i64,
    /// Connector calls that failed since start-up.
    pub connector_failures_total: u64,
    /// Batch items that failed since start-up.
    pub batch_item_failures_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "http_requests_total",
                "Requests served, by route, file action and status",
            ),
            &["route", "action", "code"],
        )
        .map_err(|source| collector_error("http_requests_total", source))?;
        let connector_requests_total = IntCounterVec::new(
            Opts::new(
                "connector_requests_total",
                "Calls issued to remote file-manager connectors",
            ),
            &["operation", "outcome"],
        )
        .map_err(|source| collector_error("connector_requests_total", source))?;
        let connector_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "connector_request_duration_seconds",
                "Latency of remote connector calls until response headers",
            ),
            &["operation"],
        )
        .map_err(|source| collector_error("connector_request_duration_seconds", source))?;
        let batch_items_total = IntCounterVec::new(
            Opts::new(
                "batch_items_total",
                "Items processed by bulk file operations",
            ),
            &["operation", "outcome"],
        )
        .map_err(|source| collector_error("batch_items_total", source))?;
        let connector_failures_total = IntCounter::with_opts(Opts::new(
            "connector_failures_total",
            "Connector calls that returned an error or never completed",
        ))
        .map_err(|source| collector_error("connector_failures_total", source))?;
        let batch_item_failures_total = IntCounter::with_opts(Opts::new(
            "batch_item_failures_total",
            "Bulk operation items recorded as failed",
        ))
        .map_err(|source| collector_error("batch_item_failures_total", source))?;
        let archive_streams_active = IntGauge::with_opts(Opts::new(
            "archive_streams_active",
            "Zip downloads currently being streamed",
        ))
        .map_err(|source| collector_error("archive_streams_active", source))?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "connector_requests_total", &connector_requests_total)?;
        register(
            &registry,
            "connector_request_duration_seconds",
            &connector_request_duration_seconds,
        )?;
        register(&registry, "batch_items_total", &batch_items_total)?;
        register(&registry, "connector_failures_total", &connector_failures_total)?;
        register(
            &registry,
            "batch_item_failures_total",
            &batch_item_failures_total,
        )?;
        register(&registry, "archive_streams_active", &archive_streams_active)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                connector_requests_total,
                connector_request_duration_seconds,
                batch_items_total,
                connector_failures_total,
                batch_item_failures_total,
                archive_streams_active,
            }),
        })
    }

    /// Count one served request; `action` is `none` when no file action ran.
    pub fn inc_http_request(&self, route: &str, action: Option<&str>, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, action.unwrap_or("none"), code.as_str()])
            .inc();
    }

    /// Record one connector call and its latency.
    pub fn observe_connector_call(&self, operation: &str, outcome: Outcome, elapsed: Duration) {
        self.inner
            .connector_requests_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
        self.inner
            .connector_request_duration_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
        if outcome == Outcome::Failure {
            self.inner.connector_failures_total.inc();
        }
    }

    /// Increment the batch item counter.
    pub fn inc_batch_item(&self, operation: &str, outcome: Outcome) {
        self.inner
            .batch_items_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
        if outcome == Outcome::Failure {
            self.inner.batch_item_failures_total.inc();
        }
    }

    /// Mark an archive stream as active until the returned guard is dropped.
    #[must_use]
    pub fn archive_stream_started(&self) -> ArchiveStreamGuard {
        self.inner.archive_streams_active.inc();
        ArchiveStreamGuard {
            metrics: self.clone(),
        }
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant series.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            archive_streams_active: self.inner.archive_streams_active.get(),
            connector_failures_total: self.inner.connector_failures_total.get(),
            batch_item_failures_total: self.inner.batch_item_failures_total.get(),
        }
    }
}

/// Keeps the `archive_streams_active` gauge raised while alive.
pub struct ArchiveStreamGuard {
    metrics: Metrics,
}

impl Drop for ArchiveStreamGuard {
    fn drop(&mut self) {
        self.metrics.inner.archive_streams_active.dec();
    }
}

fn collector_error(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::Collector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> TelemetryResult<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Collector { name, source })
}
