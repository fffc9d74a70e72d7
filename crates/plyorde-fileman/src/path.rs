//! Relative path handling.
//!
//! Every path leaving this crate is relative to the site root: no leading or
//! trailing slash, `/` as the only separator, no `..` segments. The empty
//! string is the site root.

use crate::error::{FileManagerError, FileManagerResult};

/// Normalize a caller-supplied path.
///
/// Backslashes become slashes and leading or trailing slashes are removed.
/// Any `..` segment is rejected; names that merely contain two dots (such as
/// `a..b.txt`) are kept.
///
/// # Errors
///
/// Returns [`FileManagerError::InvalidPath`] for traversal attempts.
pub fn normalize(input: &str) -> FileManagerResult<String> {
    let unified = input.trim().replace('\\', "/");
    let trimmed = unified.trim_matches('/');
    if trimmed.split('/').any(|segment| segment.trim() == "..") {
        return Err(FileManagerError::invalid_path(
            input,
            "path traversal is not allowed",
        ));
    }
    Ok(trimmed.to_string())
}

/// Ensure `path` equals `root` or lies underneath it.
///
/// An empty root permits everything.
///
/// # Errors
///
/// Returns [`FileManagerError::InvalidPath`] when `path` escapes `root`.
pub fn assert_within_root(path: &str, root: &str) -> FileManagerResult<()> {
    if is_same_or_descendant(path, root) {
        Ok(())
    } else {
        Err(FileManagerError::invalid_path(
            path,
            "path is outside the allowed root",
        ))
    }
}

/// Whether `path` is `ancestor` itself or nested below it.
pub(crate) fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Join a normalized directory and a single name.
pub(crate) fn join(directory: &str, name: &str) -> FileManagerResult<String> {
    if directory.is_empty() {
        normalize(name)
    } else {
        normalize(&format!("{directory}/{name}"))
    }
}

/// Containing directory of a normalized path.
pub(crate) fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Last segment of a normalized path.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// `path` followed by each of its ancestors, nearest first. The root is not
/// included.
pub(crate) fn self_and_ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors((!path.is_empty()).then_some(path), |current| {
        let up = parent(current);
        (!up.is_empty()).then_some(up)
    })
}

/// Turn a remote path into a safe zip entry name.
///
/// Falls back to `file` for names that are empty or would escape the
/// extraction directory.
#[must_use]
pub fn sanitize_zip_entry_name(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let trimmed = unified.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|segment| segment == "..") {
        return "file".to_string();
    }
    trimmed.to_string()
}

/// Check a single new entry name for create and rename calls.
pub(crate) fn validate_name(field: &'static str, name: &str) -> FileManagerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FileManagerError::invalid_input(
            field,
            "missing_name",
            "A name is required",
        ));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(FileManagerError::invalid_input(
            field,
            "invalid_name",
            "Names cannot contain path separators",
        ));
    }
    Ok(name.to_string())
}
