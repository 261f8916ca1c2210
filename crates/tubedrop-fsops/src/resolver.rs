//! Locate the file an extraction actually produced.
//!
//! # Design
//! - Prefer `{id}.{target_extension}`; the engine is asked for exactly that name.
//! - Post-processing can leave a different extension behind, so fall back to the
//!   largest regular file at the top level of the workspace (first seen wins ties).
//! - A zero-byte winner is reported, never delivered.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use tubedrop_core::{Artifact, DownloadError, DownloadResult, ExtractionResult, MediaFormat};
use walkdir::WalkDir;

use crate::workspace::Workspace;

/// Maps an extraction result to the artifact on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactResolver;

impl ArtifactResolver {
    /// Resolve the artifact produced for `result` inside `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ArtifactNotFound`] when the workspace holds no file or
    /// the best candidate is empty.
    pub fn resolve(
        result: &ExtractionResult,
        format: MediaFormat,
        workspace: &Workspace,
    ) -> DownloadResult<Artifact> {
        let dir = workspace.path();
        let expected = dir.join(result.expected_file_name(format));
        if let Some(size_bytes) = non_empty_file_size(&expected) {
            return Ok(Artifact {
                path: expected,
                size_bytes,
            });
        }

        debug!(
            expected = %expected.display(),
            "expected artifact missing; scanning workspace"
        );
        match largest_file(dir) {
            Some((path, size_bytes)) if size_bytes > 0 => {
                debug!(artifact = %path.display(), size_bytes, "selected fallback artifact");
                Ok(Artifact { path, size_bytes })
            }
            Some((path, _)) => Err(DownloadError::ArtifactNotFound {
                workspace: dir.to_path_buf(),
                candidate: Some(path),
            }),
            None => Err(DownloadError::ArtifactNotFound {
                workspace: dir.to_path_buf(),
                candidate: None,
            }),
        }
    }
}

fn non_empty_file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(fs::Metadata::is_file)
        .map(|meta| meta.len())
        .filter(|len| *len > 0)
}

fn largest_file(dir: &Path) -> Option<(PathBuf, u64)> {
    let mut best: Option<(PathBuf, u64)> = None;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, workspace = %dir.display(), "failed to scan workspace entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => {
                warn!(error = %err, path = %entry.path().display(), "failed to stat workspace entry");
                continue;
            }
        };
        if best.as_ref().is_none_or(|(_, best_size)| size > *best_size) {
            best = Some((entry.into_path(), size));
        }
    }
    best
}
