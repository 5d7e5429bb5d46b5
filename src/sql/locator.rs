//! Finding the project file the migrations belong to

use std::path::{Path, PathBuf};

use crate::error::SquashError;
use crate::util::contains_ci;

/// Walk up from `start` to the nearest directory holding a `*.csproj`.
///
/// When a directory holds several, the first (by name) that is not a test
/// project wins.
pub fn find_project(start: &Path) -> Result<PathBuf, SquashError> {
    let start_dir = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    for dir in start_dir.ancestors() {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let pattern = format!("{}/*.csproj", glob::Pattern::escape(&dir.to_string_lossy()));

        let Ok(paths) = glob::glob(&pattern) else {
            continue;
        };
        let mut candidates: Vec<PathBuf> = paths
            .filter_map(|p| p.ok())
            .filter(|p| p.is_file())
            .collect();
        if candidates.is_empty() {
            continue;
        }
        candidates.sort();

        let preferred = candidates
            .iter()
            .find(|p| {
                let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                !contains_ci(&name, "tests")
            })
            .unwrap_or(&candidates[0]);
        return Ok(preferred.clone());
    }

    Err(SquashError::ProjectNotFound {
        path: start.to_path_buf(),
    })
}
