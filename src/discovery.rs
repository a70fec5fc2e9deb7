//! Project root discovery.

use std::env;
use std::path::{Path, PathBuf};

use crate::{AppError, Result};

/// Marker used when the configuration names none.
pub const DEFAULT_ROOT_MARKER: &str = ".git";

/// Walk from `start` up to the filesystem root and return the first
/// directory containing any of `markers`.
#[must_use]
pub fn find_project_root<S: AsRef<str>>(start: &Path, markers: &[S]) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| markers.iter().any(|m| dir.join(m.as_ref()).exists()))
        .map(Path::to_path_buf)
}

/// Directory discovery starts from: `explicit` when given, else the
/// current working directory. A file path resolves to its parent.
///
/// # Errors
///
/// Returns [`AppError::Discovery`] if the current directory is unreadable.
pub fn starting_directory(explicit: Option<&Path>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()
            .map_err(|err| AppError::Discovery(format!("cannot read current directory: {err}")))?,
    };

    if path.is_file() {
        if let Some(parent) = path.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Ok(path)
}
