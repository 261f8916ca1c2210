//! Request-local staging of the optional cookie bundle.
//!
//! # Design
//! - Sources are tried in order: inline environment blob, then mounted file.
//! - A missing source and a failed copy both degrade to "no credentials"; neither aborts the request.
//! - The staged copy lives under `.credentials/` so artifact resolution never sees it,
//!   and it is removed together with the workspace.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use tubedrop_config::CredentialSettings;
use tubedrop_telemetry::Metrics;

use crate::error::{FsOpsError, FsOpsResult};
use crate::workspace::Workspace;

/// Subdirectory of a workspace holding staged credentials.
pub const CREDENTIALS_DIR: &str = ".credentials";
/// File name of the staged cookie bundle.
pub const CREDENTIALS_FILE: &str = "cookies.txt";

/// Request-scoped copy of the credential bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHandle {
    path: PathBuf,
}

impl CredentialHandle {
    /// Path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take ownership of the staged file path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

enum CredentialSource<'a> {
    Inline(&'a str),
    File(&'a Path),
}

/// Stages the configured credential bundle into request workspaces.
#[derive(Clone)]
pub struct CredentialProvisioner {
    inline: Option<Arc<str>>,
    file: Option<PathBuf>,
    metrics: Metrics,
}

impl CredentialProvisioner {
    /// Build a provisioner from the configured sources.
    #[must_use]
    pub fn new(settings: &CredentialSettings, metrics: Metrics) -> Self {
        Self {
            inline: settings.inline.as_deref().map(Arc::from),
            file: settings.file.clone(),
            metrics,
        }
    }

    /// Copy the credential bundle into `workspace`, if one is available.
    ///
    /// Returns `None` when no source is configured or staging fails.
    #[must_use]
    pub fn provision(&self, workspace: &Workspace) -> Option<CredentialHandle> {
        let Some(source) = self.source() else {
            warn!("no credential bundle configured; continuing without cookies");
            return None;
        };
        match stage(&source, workspace.path()) {
            Ok(handle) => {
                debug!(path = %handle.path().display(), "staged credential bundle");
                Some(handle)
            }
            Err(err) => {
                self.metrics.inc_credential_fallback();
                warn!(
                    error = %err,
                    operation = err.operation(),
                    "failed to stage credential bundle; continuing without cookies"
                );
                None
            }
        }
    }

    fn source(&self) -> Option<CredentialSource<'_>> {
        if let Some(inline) = self.inline.as_deref() {
            return Some(CredentialSource::Inline(inline));
        }
        self.file
            .as_deref()
            .filter(|path| path.exists())
            .map(CredentialSource::File)
    }
}

impl fmt::Debug for CredentialProvisioner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialProvisioner")
            .field("inline", &self.inline.as_ref().map(|_| "<redacted>"))
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

fn stage(source: &CredentialSource<'_>, workspace_dir: &Path) -> FsOpsResult<CredentialHandle> {
    let dir = workspace_dir.join(CREDENTIALS_DIR);
    fs::create_dir(&dir).map_err(|err| FsOpsError::io("credentials.create_dir", &dir, err))?;
    let path = dir.join(CREDENTIALS_FILE);
    match source {
        CredentialSource::Inline(blob) => fs::write(&path, blob.as_bytes())
            .map_err(|err| FsOpsError::io("credentials.write_inline", &path, err))?,
        CredentialSource::File(file) => {
            let bytes =
                fs::read(file).map_err(|err| FsOpsError::io("credentials.read_file", *file, err))?;
            fs::write(&path, bytes)
                .map_err(|err| FsOpsError::io("credentials.write_file", &path, err))?;
        }
    }
    restrict_permissions(&path)?;
    Ok(CredentialHandle { path })
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> FsOpsResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|err| FsOpsError::io("credentials.chmod", path, err))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> FsOpsResult<()> {
    Ok(())
}
