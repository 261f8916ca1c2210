//! Streams a staged artifact to the caller and releases its workspace.
//!
//! # Design
//! - Open and stat before the response is committed; failures there release the
//!   workspace immediately and become a problem response.
//! - After that the body stream owns the workspace. It releases it after the last
//!   chunk; if the client disconnects or a read fails, dropping the stream does.
//! - The `delivered` outcome is counted only after the last chunk; a stream that ends
//!   any other way counts as `aborted`.
//! - No error is ever appended to a partially sent body.

use std::path::Path;

use async_stream::stream;
use axum::{
    body::{Body, Bytes},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use futures_core::Stream;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};
use tubedrop_core::{Artifact, DownloadError};
use tubedrop_fsops::{StagedArtifact, Workspace};
use tubedrop_telemetry::Metrics;

use crate::http::constants::{MAX_ATTACHMENT_STEM_CHARS, STREAM_CHUNK_BYTES};
use crate::http::errors::ApiError;

/// Build the streaming response for `staged`.
pub(crate) async fn deliver(staged: StagedArtifact, telemetry: &Metrics) -> Result<Response, ApiError> {
    let StagedArtifact {
        artifact,
        title,
        format,
        workspace,
    } = staged;

    let (file, size_bytes) = match open_for_streaming(artifact.path()).await {
        Ok(opened) => opened,
        Err(err) => {
            workspace.release();
            telemetry.inc_download(format.token(), err.kind());
            error!(error = %err, path = %artifact.path().display(), "failed to open artifact");
            return Err(ApiError::from(&err));
        }
    };

    let name = attachment_name(&title, &artifact);
    info!(
        artifact = %artifact.path().display(),
        attachment = %name,
        size_bytes,
        "streaming artifact"
    );

    let delivery = Delivery {
        workspace: Some(workspace),
        format: format.token(),
        telemetry: telemetry.clone(),
        completed: false,
    };
    let body = Body::from_stream(stream_file(file, Some(delivery), telemetry.clone()));
    file_response(body, &name, artifact.path(), size_bytes)
}

pub(crate) async fn open_for_streaming(path: &Path) -> Result<(File, u64), DownloadError> {
    let file = File::open(path)
        .await
        .map_err(|source| DownloadError::Delivery {
            operation: "delivery.open",
            path: path.to_path_buf(),
            source,
        })?;
    let metadata = file
        .metadata()
        .await
        .map_err(|source| DownloadError::Delivery {
            operation: "delivery.stat",
            path: path.to_path_buf(),
            source,
        })?;
    Ok((file, metadata.len()))
}

/// Outcome bookkeeping for one streamed download; owns its workspace.
pub(crate) struct Delivery {
    workspace: Option<Workspace>,
    format: &'static str,
    telemetry: Metrics,
    completed: bool,
}

impl Delivery {
    fn complete(mut self) {
        self.completed = true;
        if let Some(workspace) = self.workspace.take() {
            workspace.release();
        }
        self.telemetry.inc_download(self.format, "delivered");
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.completed {
            self.telemetry.inc_download(self.format, "aborted");
            warn!(format = self.format, "artifact stream ended before the last chunk");
        }
    }
}

/// Chunked reader over `file`; completes `delivery` once the final chunk is read.
pub(crate) fn stream_file(
    mut file: File,
    delivery: Option<Delivery>,
    telemetry: Metrics,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    stream! {
        let mut buffer = vec![0u8; STREAM_CHUNK_BYTES];
        let mut sent: u64 = 0;
        loop {
            match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(read) => {
                    sent += read as u64;
                    telemetry.add_delivered_bytes(read as u64);
                    yield Ok(Bytes::copy_from_slice(&buffer[..read]));
                }
                Err(err) => {
                    warn!(error = %err, sent, "artifact read failed mid-stream");
                    yield Err(err);
                    return;
                }
            }
        }
        drop(file);
        if let Some(delivery) = delivery {
            delivery.complete();
        }
        debug!(sent, "artifact stream complete");
    }
}

pub(crate) fn file_response(
    body: Body,
    name: &str,
    path: &Path,
    size_bytes: u64,
) -> Result<Response, ApiError> {
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let disposition = content_disposition(name);
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type.as_ref())
        .header(CONTENT_LENGTH, size_bytes)
        .header(CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|err| {
            error!(error = %err, "failed to build artifact response");
            ApiError::internal("failed to build artifact response")
        })
}

/// Attachment file name: sanitized title plus the artifact's real extension.
///
/// Falls back to the artifact's own name when the title sanitizes to nothing.
pub(crate) fn attachment_name(title: &str, artifact: &Artifact) -> String {
    let stem: String = title
        .chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
        .take(MAX_ATTACHMENT_STEM_CHARS)
        .collect();
    let stem = stem.trim().trim_matches('.');
    if stem.is_empty() {
        return artifact.file_name();
    }
    match artifact.extension() {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
pub(crate) fn content_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii() && !ch.is_ascii_control() && ch != '"' && ch != '\\' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
