use std::sync::Arc;

use tracing::info;
use tubedrop_api::{ApiOptions, ApiServer};
use tubedrop_config::{LogFormatPreference, ServiceConfig};
use tubedrop_engine::YtDlpEngine;
use tubedrop_fsops::{CredentialProvisioner, WorkspaceRoot};
use tubedrop_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};

use crate::error::{AppError, AppResult};
use crate::orchestrator::DownloadOrchestrator;

/// Entry point for the Tubedrop boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, workspace preparation, or serving fails.
pub async fn run_app() -> AppResult<()> {
    let config = ServiceConfig::from_env().map_err(|err| AppError::config("config.load", err))?;

    let logging = LoggingConfig {
        format: log_format(&config),
        ..LoggingConfig::default()
    };
    tubedrop_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("serve");

    info!(
        listen_addr = %config.listen_addr(),
        workspace_root = %config.workspace_root.display(),
        engine = %config.engine.binary.display(),
        max_concurrent_downloads = config.max_concurrent_downloads,
        "tubedrop bootstrap starting"
    );

    let telemetry =
        Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let server = build_server(&config, &telemetry)?;
    server
        .serve(config.listen_addr())
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;

    info!("tubedrop shut down");
    Ok(())
}

/// Build the API server from `config`, preparing the workspace root on the way.
///
/// The workspace root is created if missing and swept of stale workspaces, so call
/// this before any request is served.
///
/// # Errors
///
/// Returns [`AppError::FsOps`] when the workspace root cannot be created or listed.
pub fn build_server(config: &ServiceConfig, telemetry: &Metrics) -> AppResult<ApiServer> {
    let workspaces = WorkspaceRoot::open(&config.workspace_root, telemetry.clone())
        .map_err(|err| AppError::fsops("workspace_root.open", err))?;
    workspaces
        .sweep_stale()
        .map_err(|err| AppError::fsops("workspace_root.sweep", err))?;

    let engine = Arc::new(YtDlpEngine::new(
        config.engine.binary.clone(),
        config.engine.timeout,
    ));
    let credentials = CredentialProvisioner::new(&config.credentials, telemetry.clone());
    let orchestrator = DownloadOrchestrator::new(
        engine,
        workspaces,
        credentials,
        config.max_concurrent_downloads,
        telemetry.clone(),
    );

    Ok(ApiServer::new(
        Arc::new(orchestrator),
        telemetry.clone(),
        ApiOptions {
            downloads_dir: config.downloads_dir.clone(),
        },
    ))
}

fn log_format(config: &ServiceConfig) -> LogFormat {
    match config.log_format {
        Some(LogFormatPreference::Json) => LogFormat::Json,
        Some(LogFormatPreference::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    }
}
