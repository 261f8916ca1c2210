//! Hand-off from the orchestrator to delivery.

use tubedrop_core::{Artifact, MediaFormat};

use crate::workspace::Workspace;

/// A resolved artifact together with the workspace that holds it.
///
/// Owning a `StagedArtifact` means owning the workspace cleanup: dropping it removes
/// the artifact from disk.
#[derive(Debug)]
pub struct StagedArtifact {
    /// Resolved output file.
    pub artifact: Artifact,
    /// Title reported by the engine, used for the attachment name.
    pub title: String,
    /// Requested output format.
    pub format: MediaFormat,
    /// Workspace holding `artifact`.
    pub workspace: Workspace,
}
