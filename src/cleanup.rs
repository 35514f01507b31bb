//! Best-effort cleanup: run a filesystem operation and drop its error.

use std::io;

/// Run `op`, logging and discarding any failure.
pub fn best_effort<F>(what: &str, op: F)
where
    F: FnOnce() -> io::Result<()>,
{
    if let Err(e) = op() {
        tracing::debug!(error = %e, "Ignored cleanup failure: {}", what);
    }
}

/// Remove `path` if it is an empty directory. Missing or non-empty is fine.
pub fn remove_empty_dir(path: &std::path::Path) {
    if !path.is_dir() {
        return;
    }
    best_effort("remove empty assets directory", || std::fs::remove_dir(path));
}
