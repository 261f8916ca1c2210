#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic)]

//! `yt-dlp` adapter for [`tubedrop_core::ExtractionEngine`].
//!
//! The engine runs as a child process per request. Output is confined to the
//! invocation's workspace through an absolute output template; metadata comes
//! back as JSON on stdout.

/// Command-line construction.
pub mod command;
/// Stdout/stderr interpretation.
pub mod output;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use tubedrop_core::{EngineError, EngineInvocation, ExtractionEngine, ExtractionResult};

/// Process-backed extraction engine.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlpEngine {
    /// Engine invoking `binary` with a per-run `timeout`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    async fn extract(
        &self,
        invocation: &EngineInvocation,
    ) -> Result<ExtractionResult, EngineError> {
        let args = command::build_args(invocation);
        debug!(
            program = %self.binary.display(),
            workspace = %invocation.output_dir.display(),
            selector = invocation.selection.selector(),
            cookies = invocation.credential_file.is_some(),
            "starting extraction engine"
        );

        let child = Command::new(&self.binary)
            .args(&args)
            .current_dir(&invocation.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Only the direct child is killed; helpers it spawned (ffmpeg) are not.
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program(),
                source,
            })?;

        let started = Instant::now();
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(EngineError::Reported {
                    message: format!("failed to wait for {}: {err}", self.program()),
                });
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "extraction engine timed out; child killed"
                );
                return Err(EngineError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let message = output::failure_message(&output.stderr, output.status.code());
            warn!(
                status = ?output.status.code(),
                message = %message,
                "extraction engine reported failure"
            );
            return Err(EngineError::Reported { message });
        }

        let result = output::parse_info(&output.stdout)?;
        info!(
            id = %result.id,
            ext = %result.native_extension,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "extraction engine finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::OnceLock;
    use tubedrop_core::{DownloadRequest, MediaFormat};

    const SUCCEEDS: &str = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf 'audio-bytes' > "$(dirname "$out")/video123.mp3"
printf '{"id":"video123","title":"Song","ext":"webm"}\n'
"#;
    const FAILS: &str = "#!/bin/sh\necho 'ERROR: video unavailable' >&2\nexit 1\n";
    const HANGS: &str = "#!/bin/sh\nsleep 30\n";
    const NO_ID: &str = "#!/bin/sh\necho '{\"title\":\"x\"}'\n";

    // Written once, before any test spawns a child (ETXTBSY).
    fn scripts() -> io::Result<&'static Path> {
        static DIR: OnceLock<Result<PathBuf, String>> = OnceLock::new();
        match DIR.get_or_init(|| write_scripts().map_err(|err| err.to_string())) {
            Ok(dir) => Ok(dir.as_path()),
            Err(message) => Err(io::Error::other(message.clone())),
        }
    }

    fn write_scripts() -> io::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!(
            "tubedrop-engine-scripts-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir)?;
        for (name, body) in [
            ("succeeds", SUCCEEDS),
            ("fails", FAILS),
            ("hangs", HANGS),
            ("no-id", NO_ID),
        ] {
            let path = dir.join(name);
            fs::write(&path, body)?;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(dir)
    }

    fn invocation(workspace: &Path) -> anyhow::Result<EngineInvocation> {
        let request = DownloadRequest::new("https://example.test/v", MediaFormat::Audio)?;
        Ok(EngineInvocation::for_request(&request, workspace, None))
    }

    #[tokio::test]
    async fn successful_run_returns_metadata_and_writes_file() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        let engine = YtDlpEngine::new(scripts()?.join("succeeds"), Duration::from_secs(10));
        let result = engine.extract(&invocation(workspace.path())?).await?;
        assert_eq!(result.id, "video123");
        assert_eq!(result.title, "Song");
        assert_eq!(
            fs::read_to_string(workspace.path().join("video123.mp3"))?,
            "audio-bytes"
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_zero_exit_carries_error_lines() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        let engine = YtDlpEngine::new(scripts()?.join("fails"), Duration::from_secs(10));
        let outcome = engine.extract(&invocation(workspace.path())?).await;
        match outcome {
            Err(EngineError::Reported { message }) => {
                assert_eq!(message, "ERROR: video unavailable");
            }
            other => anyhow::bail!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn slow_engine_times_out() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        let engine = YtDlpEngine::new(scripts()?.join("hangs"), Duration::from_millis(200));
        let outcome = engine.extract(&invocation(workspace.path())?).await;
        assert!(matches!(outcome, Err(EngineError::Timeout { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn success_without_id_is_malformed() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        let engine = YtDlpEngine::new(scripts()?.join("no-id"), Duration::from_secs(10));
        let outcome = engine.extract(&invocation(workspace.path())?).await;
        let Err(error) = outcome else {
            anyhow::bail!("expected malformed output");
        };
        assert_eq!(error.message(), "failed to extract metadata");
        Ok(())
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        let engine = YtDlpEngine::new(
            workspace.path().join("does-not-exist"),
            Duration::from_secs(1),
        );
        let outcome = engine.extract(&invocation(workspace.path())?).await;
        assert!(matches!(outcome, Err(EngineError::Spawn { .. })));
        Ok(())
    }
}
