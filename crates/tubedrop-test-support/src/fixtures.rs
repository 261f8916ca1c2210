//! Workspace-root inspection helpers.

use std::fs;
use std::path::{Path, PathBuf};

use tubedrop_fsops::WORKSPACE_PREFIX;

/// Request workspace directories currently present under `root`, sorted.
#[must_use]
pub fn workspace_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(WORKSPACE_PREFIX))
        })
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

/// Number of request workspaces currently present under `root`.
#[must_use]
pub fn count_workspaces(root: &Path) -> usize {
    workspace_dirs(root).len()
}
