//! Gateway to the remote file-manager connector daemons.
//!
//! Every call to a connector goes through [`ConnectorClient`]: it builds the
//! `/api/filemanager/{siteId}/{op}` URL against the site's base URL, attaches
//! the bearer token, applies the per-operation timeout and turns non-2xx
//! responses into a single normalized [`ConnectorError`]. Orchestration code
//! depends on the [`FileConnector`] trait so it can run against fakes.
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

pub mod client;
pub mod context;
pub mod error;
pub mod model;
pub mod operation;
pub mod payload;
pub mod service;

pub use client::ConnectorClient;
pub use context::SiteConnectorContext;
pub use error::{ConnectorError, ConnectorResult};
pub use model::{
    CompressRequest, DecompressRequest, EntryKind, FileEntry, RemoteDownload, UploadFile,
};
pub use operation::{ConnectorOp, ConnectorTimeouts};
pub use payload::{PayloadKind, ReadPayload, WriteRequest, build_write_request, detect};
pub use service::FileConnector;
