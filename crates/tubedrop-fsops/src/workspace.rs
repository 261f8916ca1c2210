//! Per-request workspaces under a shared root.
//!
//! # Design
//! - Each request gets a fresh `dl-<uuid>` directory created with exclusive `create_dir`.
//! - [`Workspace`] owns that directory: `release` consumes the guard and `Drop` covers
//!   every other exit, so removal happens at most once.
//! - A directory that is already gone counts as removed.
//! - Removal failures are logged and counted, never returned to the request path.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use tubedrop_telemetry::Metrics;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Name prefix of every request workspace directory.
pub const WORKSPACE_PREFIX: &str = "dl-";

/// Parent directory for request workspaces.
#[derive(Clone)]
pub struct WorkspaceRoot {
    path: PathBuf,
    metrics: Metrics,
}

impl WorkspaceRoot {
    /// Open (creating if needed) the workspace root at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] if the directory cannot be created.
    pub fn open(path: impl Into<PathBuf>, metrics: Metrics) -> FsOpsResult<Self> {
        let path = path.into();
        fs::create_dir_all(&path).map_err(|source| FsOpsError::io("root.create", &path, source))?;
        Ok(Self { path, metrics })
    }

    /// Root directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a fresh, uniquely named workspace.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] if the directory cannot be created.
    pub fn allocate(&self) -> FsOpsResult<Workspace> {
        let path = self
            .path
            .join(format!("{WORKSPACE_PREFIX}{}", Uuid::new_v4()));
        fs::create_dir(&path)
            .map_err(|source| FsOpsError::io("workspace.create", &path, source))?;
        debug!(workspace = %path.display(), "allocated request workspace");
        Ok(Workspace {
            path,
            metrics: self.metrics.clone(),
            released: false,
        })
    }

    /// Remove workspaces left behind by a previous process.
    ///
    /// Only call before serving requests; live workspaces are indistinguishable from stale ones.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Walkdir`] if the root cannot be listed. Individual removal
    /// failures are logged and skipped.
    pub fn sweep_stale(&self) -> FsOpsResult<usize> {
        let mut removed = 0usize;
        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1) {
            let entry =
                entry.map_err(|source| FsOpsError::walkdir("root.sweep", &self.path, source))?;
            let is_workspace = entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(WORKSPACE_PREFIX));
            if !is_workspace {
                continue;
            }
            match remove_workspace_dir(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) => {
                    self.metrics.inc_cleanup_failure();
                    warn!(
                        error = %err,
                        path = %entry.path().display(),
                        "failed to remove stale workspace"
                    );
                }
            }
        }
        if removed > 0 {
            info!(removed, root = %self.path.display(), "removed stale workspaces");
        }
        Ok(removed)
    }
}

impl fmt::Debug for WorkspaceRoot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WorkspaceRoot")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Exclusive owner of one request workspace directory.
pub struct Workspace {
    path: PathBuf,
    metrics: Metrics,
    released: bool,
}

impl Workspace {
    /// Workspace directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace now.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match remove_workspace_dir(&self.path) {
            Ok(()) => debug!(workspace = %self.path.display(), "released request workspace"),
            Err(err) => {
                self.metrics.inc_cleanup_failure();
                error!(
                    error = %err,
                    workspace = %self.path.display(),
                    "failed to release request workspace"
                );
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Workspace")
            .field("path", &self.path)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// Recursively remove a workspace directory; a missing directory is success.
///
/// # Errors
///
/// Returns [`FsOpsError::Io`] for any failure other than "not found".
pub fn remove_workspace_dir(path: &Path) -> FsOpsResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(FsOpsError::io("workspace.remove", path, err)),
    }
}
