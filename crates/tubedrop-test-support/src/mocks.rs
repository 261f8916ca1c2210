//! Scripted [`ExtractionEngine`] double.
//!
//! Writes configured files into the invocation's workspace and returns a fixed
//! result, or fails with a fixed message. Every invocation is recorded, and the
//! peak number of overlapping calls is tracked for concurrency assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tubedrop_core::{EngineError, EngineInvocation, ExtractionEngine, ExtractionResult};

#[derive(Debug, Clone)]
enum FileContents {
    Bytes(Vec<u8>),
    Url,
}

#[derive(Debug, Clone)]
enum Outcome {
    Succeed(ExtractionResult),
    Fail(String),
    Malformed,
}

/// Engine double driven by a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    outcome: Outcome,
    files: Vec<(String, FileContents)>,
    delay: Option<Duration>,
    state: Arc<EngineState>,
}

#[derive(Debug, Default)]
struct EngineState {
    invocations: Mutex<Vec<EngineInvocation>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedEngine {
    /// Succeed with the given id and title, writing no files unless added.
    #[must_use]
    pub fn succeeding(id: &str, title: &str) -> Self {
        Self::with_outcome(Outcome::Succeed(ExtractionResult {
            id: id.to_string(),
            title: title.to_string(),
            native_extension: "webm".to_string(),
        }))
    }

    /// Fail with `message` as the engine diagnostic.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::with_outcome(Outcome::Fail(message.to_string()))
    }

    /// Succeed without a usable id.
    #[must_use]
    pub fn malformed() -> Self {
        Self::with_outcome(Outcome::Malformed)
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            files: Vec::new(),
            delay: None,
            state: Arc::new(EngineState::default()),
        }
    }

    /// Write `name` with `contents` into the workspace on every call.
    #[must_use]
    pub fn with_file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .push((name.to_string(), FileContents::Bytes(contents.into())));
        self
    }

    /// Write `name` containing the requested URL into the workspace on every call.
    #[must_use]
    pub fn with_url_file(mut self, name: &str) -> Self {
        self.files.push((name.to_string(), FileContents::Url));
        self
    }

    /// Sleep for `delay` before producing output.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Invocations received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<EngineInvocation> {
        self.state
            .invocations
            .lock()
            .map(|log| log.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of invocations received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations().len()
    }

    /// Largest number of overlapping `extract` calls observed.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    async fn run(&self, invocation: &EngineInvocation) -> Result<ExtractionResult, EngineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for (name, contents) in &self.files {
            let bytes = match contents {
                FileContents::Bytes(bytes) => bytes.clone(),
                FileContents::Url => invocation.url.clone().into_bytes(),
            };
            let path = invocation.output_dir.join(name);
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|err| EngineError::Reported {
                    message: format!("scripted engine failed to write {}: {err}", path.display()),
                })?;
        }
        match &self.outcome {
            Outcome::Succeed(result) => Ok(result.clone()),
            Outcome::Fail(message) => Err(EngineError::Reported {
                message: message.clone(),
            }),
            Outcome::Malformed => Err(EngineError::MalformedOutput {
                detail: "scripted engine returned no id".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    async fn extract(
        &self,
        invocation: &EngineInvocation,
    ) -> Result<ExtractionResult, EngineError> {
        if let Ok(mut log) = self.state.invocations.lock() {
            log.push(invocation.clone());
        }
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(active, Ordering::SeqCst);
        let outcome = self.run(invocation).await;
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
