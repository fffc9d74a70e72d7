//! Remote file-manager orchestration.
//!
//! Sits between the HTTP adapter and the connector gateway: validates and
//! normalizes paths, picks collision-free names, fans bulk operations out
//! over a bounded worker pool, and streams multi-file zip downloads.
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

pub mod archive;
pub mod batch;
pub mod error;
pub mod limits;
pub mod naming;
pub mod path;
pub mod report;
pub mod service;

pub use archive::{ArchiveDownload, stream_zip, zip_filename};
pub use batch::{BatchFailure, BatchOutcome, run_batch, run_chunked};
pub use error::{FileManagerError, FileManagerResult};
pub use limits::{CopyOptions, FileManagerLimits};
pub use naming::{Placement, PlacementError, next_name, place_with_unique_name, split_name};
pub use path::{assert_within_root, normalize};
pub use report::{
    CopiedEntry, CopyFailure, CopyReport, DeleteFailure, DeleteReport, MoveFailure, MoveReport,
    MovedEntry, RenameOutcome, UploadReport, UploadResult,
};
pub use service::FileManager;
