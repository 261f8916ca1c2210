//! # Design
//!
//! - Constant-message errors for workspace and credential operations.
//! - Context (operation, path) lives in fields so logs stay structured.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by request-scoped filesystem operations.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failure while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failure.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Operation label attached to the failure.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Io { operation, .. } | Self::Walkdir { operation, .. } => operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use walkdir::WalkDir;

    #[test]
    fn helpers_keep_operation_and_source() -> anyhow::Result<()> {
        let io_err = FsOpsError::io("workspace.create", "/tmp/x", io::Error::other("io"));
        assert_eq!(io_err.operation(), "workspace.create");
        assert_eq!(io_err.to_string(), "fsops io failure");
        assert!(io_err.source().is_some());

        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("missing");
        let walk_error = WalkDir::new(&missing)
            .into_iter()
            .next()
            .and_then(Result::err)
            .ok_or_else(|| anyhow::anyhow!("expected walkdir error"))?;
        let walk_err = FsOpsError::walkdir("root.sweep", &missing, walk_error);
        assert_eq!(walk_err.operation(), "root.sweep");
        assert!(walk_err.source().is_some());
        Ok(())
    }
}
