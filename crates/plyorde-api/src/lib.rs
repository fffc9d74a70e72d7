//! HTTP surface of the file-manager proxy.
//!
//! Every file route lives under `/v1/sites/{site_id}/files`, requires an API
//! key, and resolves the site's connector before touching the remote host.
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

pub mod http;
pub mod models;
pub mod state;

pub use http::router::ApiServer;
pub use state::{ApiState, SiteResolver};
