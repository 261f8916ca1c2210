//! Download pipeline abstraction consumed by the HTTP layer.

use std::sync::Arc;

use async_trait::async_trait;
use tubedrop_core::{DownloadRequest, DownloadResult};
use tubedrop_fsops::StagedArtifact;

/// Produces a staged artifact for a validated request.
///
/// On success the caller owns the returned workspace; on failure the implementation
/// has already released anything it allocated.
#[async_trait]
pub trait DownloadWorkflow: Send + Sync {
    /// Run extraction and resolution for `request`.
    async fn stage(&self, request: DownloadRequest) -> DownloadResult<StagedArtifact>;
}

/// Shared reference to the download pipeline.
pub type SharedWorkflow = Arc<dyn DownloadWorkflow>;
