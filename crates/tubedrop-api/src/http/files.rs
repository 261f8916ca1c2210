//! `GET /downloads/{name}`: serve a file from the persisted downloads directory.

use std::path::{Component, Path};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path as RoutePath, State},
    response::Response,
};
use tracing::debug;

use crate::http::delivery::{file_response, open_for_streaming, stream_file};
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    RoutePath(name): RoutePath<String>,
) -> Result<Response, ApiError> {
    let Some(dir) = state.downloads_dir.as_deref() else {
        return Err(ApiError::not_found("downloads directory is not configured"));
    };
    if !is_plain_file_name(&name) {
        debug!(name = %name, "rejected download file name");
        return Err(ApiError::not_found("file not found"));
    }

    let path = dir.join(&name);
    if !tokio::fs::metadata(&path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
    {
        return Err(ApiError::not_found("file not found"));
    }

    let (file, size_bytes) = open_for_streaming(&path)
        .await
        .map_err(|error| ApiError::from(&error))?;
    let body = Body::from_stream(stream_file(file, None, state.telemetry.clone()));
    file_response(body, &name, &path, size_bytes)
}

/// Exactly one normal path component: no separators, `..`, or roots.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_component_names_are_served() {
        assert!(is_plain_file_name("song.mp3"));
        assert!(is_plain_file_name(".hidden"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name("a/b.mp3"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name("..\\secret"));
        assert!(!is_plain_file_name(""));
    }
}
