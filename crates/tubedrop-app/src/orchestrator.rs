//! Extraction pipeline: limiter permit, workspace, credentials, engine, resolver.
//!
//! # Design
//! - The permit covers extraction and resolution only; streaming happens after it drops.
//! - Every failure path releases the workspace before returning.
//! - On success the workspace moves into the [`StagedArtifact`] and delivery owns cleanup.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tubedrop_api::DownloadWorkflow;
use tubedrop_core::{
    DownloadError, DownloadRequest, DownloadResult, EngineInvocation, ExtractionEngine,
};
use tubedrop_fsops::{
    ArtifactResolver, CredentialProvisioner, FsOpsError, StagedArtifact, WorkspaceRoot,
};
use tubedrop_telemetry::Metrics;

/// Runs one download request through the extraction engine.
pub struct DownloadOrchestrator {
    engine: Arc<dyn ExtractionEngine>,
    workspaces: WorkspaceRoot,
    credentials: CredentialProvisioner,
    limiter: Arc<Semaphore>,
    telemetry: Metrics,
}

impl DownloadOrchestrator {
    /// Wire the orchestrator; at most `max_concurrent` extractions run at once.
    #[must_use]
    pub fn new(
        engine: Arc<dyn ExtractionEngine>,
        workspaces: WorkspaceRoot,
        credentials: CredentialProvisioner,
        max_concurrent: usize,
        telemetry: Metrics,
    ) -> Self {
        Self {
            engine,
            workspaces,
            credentials,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            telemetry,
        }
    }
}

#[async_trait]
impl DownloadWorkflow for DownloadOrchestrator {
    async fn stage(&self, request: DownloadRequest) -> DownloadResult<StagedArtifact> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| DownloadError::Extraction {
                message: "download limiter closed".to_string(),
            })?;

        let workspace = self
            .workspaces
            .allocate()
            .map_err(|err| workspace_error(self.workspaces.path(), err))?;
        let credential = self.credentials.provision(&workspace);
        let invocation = EngineInvocation::for_request(
            &request,
            workspace.path(),
            credential.map(|handle| handle.into_path()),
        );

        let started = Instant::now();
        let extracted = self.engine.extract(&invocation).await;
        self.telemetry.observe_extraction_latency(started.elapsed());
        let result = match extracted {
            Ok(result) if result.id.trim().is_empty() => {
                warn!(workspace = %workspace.path().display(), "engine returned no media id");
                workspace.release();
                return Err(DownloadError::Extraction {
                    message: "failed to extract metadata".to_string(),
                });
            }
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, workspace = %workspace.path().display(), "extraction failed");
                workspace.release();
                return Err(DownloadError::extraction(&err));
            }
        };

        let artifact = match ArtifactResolver::resolve(&result, request.format(), &workspace) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "artifact resolution failed");
                workspace.release();
                return Err(err);
            }
        };

        info!(
            id = %result.id,
            artifact = %artifact.path().display(),
            size_bytes = artifact.size_bytes,
            "artifact staged"
        );
        Ok(StagedArtifact {
            artifact,
            title: result.title,
            format: request.format(),
            workspace,
        })
    }
}

fn workspace_error(root: &Path, err: FsOpsError) -> DownloadError {
    match err {
        FsOpsError::Io {
            operation,
            path,
            source,
        } => DownloadError::Workspace {
            operation,
            path,
            source,
        },
        other => DownloadError::Workspace {
            operation: other.operation(),
            path: root.to_path_buf(),
            source: io::Error::other(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubedrop_config::CredentialSettings;
    use tubedrop_core::MediaFormat;
    use tubedrop_test_support::{ScriptedEngine, count_workspaces};

    fn orchestrator(
        engine: ScriptedEngine,
        root: &Path,
        credentials: CredentialSettings,
    ) -> anyhow::Result<(DownloadOrchestrator, Metrics)> {
        let metrics = Metrics::new()?;
        let orchestrator = DownloadOrchestrator::new(
            Arc::new(engine),
            WorkspaceRoot::open(root, metrics.clone())?,
            CredentialProvisioner::new(&credentials, metrics.clone()),
            2,
            metrics.clone(),
        );
        Ok((orchestrator, metrics))
    }

    fn no_credentials() -> CredentialSettings {
        CredentialSettings {
            inline: None,
            file: None,
        }
    }

    #[tokio::test]
    async fn stages_expected_artifact() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine =
            ScriptedEngine::succeeding("video123", "Song").with_file("video123.mp3", b"audio".to_vec());
        let (orchestrator, _) = orchestrator(engine.clone(), temp.path(), no_credentials())?;

        let request = DownloadRequest::new("https://example.com/v", MediaFormat::Audio)?;
        let staged = orchestrator
            .stage(request)
            .await
            .map_err(|err| anyhow::anyhow!("stage failed: {err}"))?;
        assert_eq!(staged.artifact.file_name(), "video123.mp3");
        assert_eq!(staged.title, "Song");
        assert_eq!(count_workspaces(temp.path()), 1);

        let invocations = engine.invocations();
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].single_item_only);
        assert!(invocations[0].credential_file.is_none());

        drop(staged);
        assert_eq!(count_workspaces(temp.path()), 0);
        Ok(())
    }

    #[tokio::test]
    async fn inline_credentials_reach_the_engine() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = ScriptedEngine::succeeding("abc", "t").with_file("abc.mp4", b"v".to_vec());
        let (orchestrator, _) = orchestrator(
            engine.clone(),
            temp.path(),
            CredentialSettings {
                inline: Some("# Netscape HTTP Cookie File".to_string()),
                file: None,
            },
        )?;

        let staged = orchestrator
            .stage(DownloadRequest::new("https://example.com/v", MediaFormat::Video)?)
            .await
            .map_err(|err| anyhow::anyhow!("stage failed: {err}"))?;
        let invocations = engine.invocations();
        let credential = invocations[0]
            .credential_file
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("credential file missing"))?;
        assert!(credential.starts_with(staged.workspace.path()));
        Ok(())
    }

    #[tokio::test]
    async fn engine_failure_releases_workspace() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (orchestrator, metrics) = orchestrator(
            ScriptedEngine::failing("ERROR: video unavailable"),
            temp.path(),
            no_credentials(),
        )?;

        let Err(error) = orchestrator
            .stage(DownloadRequest::new("https://example.com/v", MediaFormat::Video)?)
            .await
        else {
            anyhow::bail!("expected extraction failure");
        };
        assert_eq!(error.kind(), "extraction");
        assert_eq!(error.detail(), "ERROR: video unavailable");
        assert_eq!(count_workspaces(temp.path()), 0);
        assert_eq!(metrics.snapshot().workspace_cleanup_failures_total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_metadata_is_an_extraction_failure() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (orchestrator, _) =
            orchestrator(ScriptedEngine::malformed(), temp.path(), no_credentials())?;

        let Err(error) = orchestrator
            .stage(DownloadRequest::new("https://example.com/v", MediaFormat::Audio)?)
            .await
        else {
            anyhow::bail!("expected extraction failure");
        };
        assert_eq!(error.detail(), "failed to extract metadata");
        assert_eq!(count_workspaces(temp.path()), 0);
        Ok(())
    }

    #[tokio::test]
    async fn blank_media_id_is_an_extraction_failure() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = ScriptedEngine::succeeding(" ", "Song").with_file("whatever.webm", b"bytes".to_vec());
        let (orchestrator, _) = orchestrator(engine, temp.path(), no_credentials())?;

        let Err(error) = orchestrator
            .stage(DownloadRequest::new("https://example.com/v", MediaFormat::Audio)?)
            .await
        else {
            anyhow::bail!("expected extraction failure");
        };
        assert_eq!(error.kind(), "extraction");
        assert_eq!(error.detail(), "failed to extract metadata");
        assert_eq!(count_workspaces(temp.path()), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_workspace_is_artifact_not_found() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (orchestrator, _) = orchestrator(
            ScriptedEngine::succeeding("abc", "t"),
            temp.path(),
            no_credentials(),
        )?;

        let Err(error) = orchestrator
            .stage(DownloadRequest::new("https://example.com/v", MediaFormat::Video)?)
            .await
        else {
            anyhow::bail!("expected resolution failure");
        };
        assert_eq!(error.kind(), "artifact_not_found");
        assert_eq!(count_workspaces(temp.path()), 0);
        Ok(())
    }
}
