pub mod build;
pub mod check;
pub mod completions;
pub mod rewrite;

use std::path::{Path, PathBuf};

/// Use `explicit` paths when given, otherwise the configured artifact list.
///
/// Explicit relative paths resolve against `project_root`.
pub fn artifact_paths(explicit: &[PathBuf], configured: &[PathBuf], project_root: &Path) -> Vec<PathBuf> {
    if explicit.is_empty() {
        return configured.to_vec();
    }
    explicit.iter().map(|p| project_root.join(p)).collect()
}
