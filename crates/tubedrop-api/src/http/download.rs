//! `POST /download`: validate, stage through the workflow, then stream the artifact.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::Response};
use tracing::{info, warn};
use tubedrop_core::{DownloadError, DownloadRequest};
use tubedrop_telemetry::{current_request_id, current_route};

use crate::http::delivery::deliver;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn download(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = DownloadRequest::from_json(&body).map_err(|source| {
        let error = DownloadError::from(source);
        state.telemetry.inc_download("unknown", "rejected");
        warn!(
            request_id = current_request_id().as_deref().unwrap_or_default(),
            route = current_route().as_deref().unwrap_or_default(),
            detail = %error.detail(),
            "download request rejected"
        );
        ApiError::from(&error)
    })?;

    let format = request.format();
    info!(url = %request.url(), format = %format, "download requested");

    let staged = {
        let _in_flight = state.telemetry.track_download();
        state.downloads.stage(request).await
    };
    let staged = staged.map_err(|error| {
        state.telemetry.inc_download(format.token(), error.kind());
        warn!(
            error = %error,
            detail = %error.detail(),
            kind = error.kind(),
            "download failed"
        );
        ApiError::from(&error)
    })?;

    deliver(staged, &state.telemetry).await
}
