//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tubedrop_core::DownloadError;

use crate::http::constants::{
    PROBLEM_ARTIFACT_MISSING, PROBLEM_BAD_REQUEST, PROBLEM_DELIVERY_FAILED,
    PROBLEM_EXTRACTION_FAILED, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
};
use crate::models::ProblemDetails;

/// Structured API error rendered as a problem document.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, PROBLEM_NOT_FOUND, "resource not found")
            .with_detail(detail)
    }
}

impl From<&DownloadError> for ApiError {
    fn from(error: &DownloadError) -> Self {
        let base = match error {
            DownloadError::Validation { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                PROBLEM_BAD_REQUEST,
                "invalid download request",
            ),
            DownloadError::Workspace { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_INTERNAL,
                "internal server error",
            ),
            DownloadError::Extraction { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_EXTRACTION_FAILED,
                "extraction failed",
            ),
            DownloadError::ArtifactNotFound { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_ARTIFACT_MISSING,
                "no output file produced",
            ),
            DownloadError::Delivery { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_DELIVERY_FAILED,
                "delivery failed",
            ),
        };
        base.with_detail(error.detail())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tubedrop_core::ValidationError;

    #[test]
    fn download_errors_map_to_statuses() {
        let cases = [
            (
                DownloadError::from(ValidationError::MissingUrl),
                StatusCode::BAD_REQUEST,
                PROBLEM_BAD_REQUEST,
            ),
            (
                DownloadError::Extraction {
                    message: "video unavailable".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_EXTRACTION_FAILED,
            ),
            (
                DownloadError::ArtifactNotFound {
                    workspace: PathBuf::from("/w"),
                    candidate: None,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_ARTIFACT_MISSING,
            ),
            (
                DownloadError::Delivery {
                    operation: "delivery.open",
                    path: PathBuf::from("/w/a.mp3"),
                    source: std::io::Error::other("gone"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_DELIVERY_FAILED,
            ),
        ];
        for (error, status, kind) in cases {
            let api = ApiError::from(&error);
            assert_eq!(api.status, status);
            assert_eq!(api.kind, kind);
        }
    }

    #[test]
    fn extraction_detail_is_engine_message() {
        let api = ApiError::from(&DownloadError::Extraction {
            message: "video unavailable".to_string(),
        });
        assert_eq!(api.detail.as_deref(), Some("video unavailable"));
    }
}
