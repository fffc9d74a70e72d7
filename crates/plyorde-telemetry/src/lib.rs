//! Telemetry primitives shared across the Plyorde workspace.
//!
//! Logging bootstrap, request-id layers, task-local request context and the
//! Prometheus registry live here so the gateway, orchestrator and HTTP
//! surfaces report through one consistent set of collectors.
#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{
    FILE_ACTION_FIELD, RequestScope, current_request_id, current_route, current_site_id,
    record_file_action,
};
pub use error::{TelemetryError, TelemetryResult};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::{ArchiveStreamGuard, Metrics, MetricsSnapshot, Outcome};
