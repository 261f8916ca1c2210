//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderName, Method, Request,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info, warn};
use tubedrop_telemetry::{Metrics, build_sha};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::download::download;
use crate::http::files::download_file;
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;
use crate::workflow::SharedWorkflow;

/// Optional surfaces of the API.
#[derive(Debug, Clone, Default)]
pub struct ApiOptions {
    /// Directory served by `GET /downloads/{name}`; the route answers 404 when unset.
    pub downloads_dir: Option<PathBuf>,
}

/// Axum router wrapper that hosts the Tubedrop API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the server with the download workflow wired through application state.
    #[must_use]
    pub fn new(downloads: SharedWorkflow, telemetry: Metrics, options: ApiOptions) -> Self {
        let state = Arc::new(ApiState::new(
            downloads,
            telemetry.clone(),
            options.downloads_dir,
        ));

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)])
            .expose_headers([CONTENT_DISPOSITION]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(tubedrop_telemetry::set_request_id_layer())
            .layer(tubedrop_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/download", post(download))
            .route("/downloads/{name}", get(download_file))
    }

    /// Consume the server and return the underlying router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] when the listener cannot be bound or the server fails.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "starting api listener");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{StatusCode, header::CONTENT_LENGTH};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use tubedrop_core::{Artifact, DownloadError, DownloadRequest, DownloadResult};
    use tubedrop_fsops::{StagedArtifact, WorkspaceRoot};

    use crate::models::{HealthResponse, ProblemDetails};
    use crate::workflow::DownloadWorkflow;

    enum Outcome {
        Stage { file: &'static str, title: &'static str },
        Fail(&'static str),
    }

    struct FakeWorkflow {
        root: WorkspaceRoot,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DownloadWorkflow for FakeWorkflow {
        async fn stage(&self, request: DownloadRequest) -> DownloadResult<StagedArtifact> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Fail(message) => Err(DownloadError::Extraction {
                    message: message.to_string(),
                }),
                Outcome::Stage { file, title } => {
                    let workspace =
                        self.root
                            .allocate()
                            .map_err(|err| DownloadError::Workspace {
                                operation: "test.allocate",
                                path: self.root.path().to_path_buf(),
                                source: std::io::Error::other(err.to_string()),
                            })?;
                    let path = workspace.path().join(file);
                    std::fs::write(&path, b"media-bytes").map_err(|source| {
                        DownloadError::Workspace {
                            operation: "test.write",
                            path: path.clone(),
                            source,
                        }
                    })?;
                    Ok(StagedArtifact {
                        artifact: Artifact {
                            path,
                            size_bytes: 11,
                        },
                        title: title.to_string(),
                        format: request.format(),
                        workspace,
                    })
                }
            }
        }
    }

    struct Harness {
        _temp: TempDir,
        workflow: Arc<FakeWorkflow>,
        router: Router,
        metrics: Metrics,
        root: PathBuf,
    }

    fn harness(outcome: Outcome, downloads_dir: Option<PathBuf>) -> anyhow::Result<Harness> {
        let temp = tempfile::tempdir()?;
        let metrics = Metrics::new()?;
        let root = WorkspaceRoot::open(temp.path().join("work"), metrics.clone())?;
        let root_path = root.path().to_path_buf();
        let workflow = Arc::new(FakeWorkflow {
            root,
            outcome,
            calls: AtomicUsize::new(0),
        });
        let router = ApiServer::new(
            workflow.clone(),
            metrics.clone(),
            ApiOptions { downloads_dir },
        )
        .into_router();
        Ok(Harness {
            _temp: temp,
            workflow,
            router,
            metrics,
            root: root_path,
        })
    }

    fn post_download(body: &str) -> anyhow::Result<Request<Body>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri("/download")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?)
    }

    fn get(uri: &str) -> anyhow::Result<Request<Body>> {
        Ok(Request::builder().uri(uri).body(Body::empty())?)
    }

    async fn problem(response: axum::response::Response) -> anyhow::Result<ProblemDetails> {
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn workspace_count(root: &std::path::Path) -> anyhow::Result<usize> {
        Ok(std::fs::read_dir(root)?.count())
    }

    #[tokio::test]
    async fn download_streams_artifact_with_attachment_headers() -> anyhow::Result<()> {
        let harness = harness(
            Outcome::Stage {
                file: "video123.mp3",
                title: "Song",
            },
            None,
        )?;
        let response = harness
            .router
            .clone()
            .oneshot(post_download(
                r#"{"url":"https://example.com/v","format":"mp3"}"#,
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "audio/mpeg");
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
        let disposition = response.headers()[CONTENT_DISPOSITION].to_str()?.to_string();
        assert!(disposition.contains("filename=\"Song.mp3\""));
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));

        let body = response.into_body().collect().await?.to_bytes();
        assert_eq!(&body[..], b"media-bytes");
        assert_eq!(workspace_count(&harness.root)?, 0);
        assert_eq!(harness.metrics.snapshot().downloads_in_flight, 0);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_workflow() -> anyhow::Result<()> {
        let harness = harness(
            Outcome::Stage {
                file: "x.mp4",
                title: "x",
            },
            None,
        )?;
        for body in [
            r"{}",
            r#"{"url":"   "}"#,
            r#"{"url":"https://example.com/v","format":"flac"}"#,
            "not json",
        ] {
            let response = harness.router.clone().oneshot(post_download(body)?).await?;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            let problem = problem(response).await?;
            assert_eq!(problem.status, 400);
            assert!(problem.detail.is_some());
        }
        assert_eq!(harness.workflow.calls.load(Ordering::SeqCst), 0);
        assert_eq!(workspace_count(&harness.root)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn workflow_failure_is_a_problem_response() -> anyhow::Result<()> {
        let harness = harness(Outcome::Fail("ERROR: video unavailable"), None)?;
        let response = harness
            .router
            .clone()
            .oneshot(post_download(r#"{"url":"https://example.com/v"}"#)?)
            .await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let problem = problem(response).await?;
        assert_eq!(problem.detail.as_deref(), Some("ERROR: video unavailable"));
        assert_eq!(harness.metrics.snapshot().downloads_in_flight, 0);
        let rendered = harness.metrics.render()?;
        assert!(rendered.contains(r#"downloads_total{format="mp4",outcome="extraction"} 1"#));
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_build_and_in_flight() -> anyhow::Result<()> {
        let harness = harness(Outcome::Fail("unused"), None)?;
        let response = harness.router.clone().oneshot(get("/health")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await?.to_bytes();
        let health: HealthResponse = serde_json::from_slice(&bytes)?;
        assert_eq!(health.status, "ok");
        assert_eq!(health.downloads_in_flight, 0);

        let metrics = harness.router.clone().oneshot(get("/metrics")?).await?;
        assert_eq!(metrics.status(), StatusCode::OK);
        assert_eq!(
            metrics.headers()[CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        Ok(())
    }

    #[tokio::test]
    async fn files_route_serves_plain_names_only() -> anyhow::Result<()> {
        let downloads = tempfile::tempdir()?;
        std::fs::write(downloads.path().join("kept.mp4"), b"persisted")?;
        let harness = harness(
            Outcome::Fail("unused"),
            Some(downloads.path().to_path_buf()),
        )?;

        let response = harness
            .router
            .clone()
            .oneshot(get("/downloads/kept.mp4")?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "video/mp4");
        let body = response.into_body().collect().await?.to_bytes();
        assert_eq!(&body[..], b"persisted");
        assert!(downloads.path().join("kept.mp4").exists());

        for uri in ["/downloads/missing.mp4", "/downloads/..", "/downloads/%2E%2E%2Fetc"] {
            let response = harness.router.clone().oneshot(get(uri)?).await?;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn files_route_is_not_found_when_unconfigured() -> anyhow::Result<()> {
        let harness = harness(Outcome::Fail("unused"), None)?;
        let response = harness
            .router
            .clone()
            .oneshot(get("/downloads/kept.mp4")?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let problem = problem(response).await?;
        assert_eq!(problem.status, 404);
        Ok(())
    }
}
