//! Collision-free naming for writes.
//!
//! # Design
//! - Attempt 0 uses the requested name; attempt `n` inserts ` (n)` before the
//!   extension.
//! - Only name collisions move on to the next candidate; any other connector
//!   failure ends the loop immediately.

use std::future::Future;

use plyorde_connector::{ConnectorError, ConnectorResult};
use tracing::debug;

use crate::error::FileManagerError;
use crate::path::join;

/// Split a file name into stem and extension (including the dot).
///
/// Dotfiles and names without a dot have an empty extension.
#[must_use]
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

/// Candidate name for the given attempt.
#[must_use]
pub fn next_name(original: &str, attempt: u32) -> String {
    if attempt == 0 {
        return original.to_string();
    }
    let (stem, extension) = split_name(original);
    format!("{stem} ({attempt}){extension}")
}

/// Name and path a write finally landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Chosen file name.
    pub name: String,
    /// Full relative path.
    pub path: String,
}

/// Why a write could not be placed.
#[derive(Debug)]
pub enum PlacementError {
    /// The candidate name did not form a valid path.
    Invalid(FileManagerError),
    /// Every candidate collided.
    Exhausted {
        /// Name the caller asked for.
        name: String,
        /// Number of candidates tried.
        attempts: u32,
    },
    /// The connector rejected a candidate for a reason other than a collision.
    Rejected {
        /// Candidate that was rejected.
        placement: Placement,
        /// Connector failure.
        error: ConnectorError,
    },
}

impl From<PlacementError> for FileManagerError {
    fn from(value: PlacementError) -> Self {
        match value {
            PlacementError::Invalid(err) => err,
            PlacementError::Exhausted { name, attempts } => Self::NameExhausted { name, attempts },
            PlacementError::Rejected { error, .. } => Self::Connector { source: error },
        }
    }
}

/// Try `attempt` with successive candidate names inside `directory`.
///
/// Candidates `0..=max_attempts` are tried in order.
///
/// # Errors
///
/// See [`PlacementError`].
pub async fn place_with_unique_name<F, Fut>(
    directory: &str,
    original: &str,
    max_attempts: u32,
    mut attempt: F,
) -> Result<Placement, PlacementError>
where
    F: FnMut(Placement) -> Fut,
    Fut: Future<Output = ConnectorResult<()>>,
{
    for index in 0..=max_attempts {
        let name = next_name(original, index);
        let path = join(directory, &name).map_err(PlacementError::Invalid)?;
        let placement = Placement { name, path };
        match attempt(placement.clone()).await {
            Ok(()) => return Ok(placement),
            Err(err) if err.is_name_collision() => {
                debug!(path = %placement.path, attempt = index, "name taken, trying next candidate");
            }
            Err(error) => return Err(PlacementError::Rejected { placement, error }),
        }
    }
    Err(PlacementError::Exhausted {
        name: original.to_string(),
        attempts: max_attempts.saturating_add(1),
    })
}
