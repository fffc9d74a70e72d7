//! File-manager routes.
//!
//! # Design
//! - Mutating operations are described by the closed [`actions::FileAction`]
//!   enum; dedicated routes and `POST /actions` both build an action and run
//!   it through the same dispatcher.
//! - Transfers (list, upload, download, zip download) stream and are handled
//!   separately.

pub mod actions;
pub(crate) mod extract;
pub(crate) mod handlers;
pub(crate) mod transfer;

#[cfg(test)]
mod tests;
