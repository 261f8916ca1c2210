//! # Design
//!
//! - One taxonomy for everything that can end a download request.
//! - Keep `Display` messages constant; carry context (paths, engine output) in fields.
//! - `detail()` renders the caller-facing message; engine messages pass through verbatim.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Inbound request shape failures. Raised before any resource is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Body was not a JSON object.
    #[error("request body must be a JSON object")]
    MalformedBody,
    /// `url` was absent, not a string, or blank.
    #[error("provide a non-empty 'url'")]
    MissingUrl,
    /// `format` was present but not a recognised token.
    #[error("'format' must be mp3 or mp4")]
    InvalidFormat {
        /// Offending value as received.
        value: String,
    },
}

/// Failures reported by an extraction engine adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine ran and reported failure.
    #[error("extraction engine reported failure")]
    Reported {
        /// Engine diagnostic, verbatim.
        message: String,
    },
    /// The engine process could not be started.
    #[error("extraction engine could not be started")]
    Spawn {
        /// Program that failed to launch.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The engine did not finish within the configured timeout.
    #[error("extraction engine timed out")]
    Timeout {
        /// Timeout that elapsed, in seconds.
        seconds: u64,
    },
    /// The engine succeeded but its metadata could not be read.
    #[error("extraction engine output was malformed")]
    MalformedOutput {
        /// Parser diagnostic.
        detail: String,
    },
}

impl EngineError {
    /// Caller-facing message for the failure.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Reported { message } => message.clone(),
            Self::Spawn { program, source } => format!("failed to start {program}: {source}"),
            Self::Timeout { seconds } => format!("extraction timed out after {seconds}s"),
            Self::MalformedOutput { .. } => "failed to extract metadata".to_string(),
        }
    }
}

/// Terminal failure of a download request.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Request failed validation; no resources were allocated.
    #[error("invalid download request")]
    Validation {
        /// Underlying validation failure.
        #[from]
        source: ValidationError,
    },
    /// The request workspace could not be created.
    #[error("failed to allocate request workspace")]
    Workspace {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The engine failed or produced no identifiable result.
    #[error("extraction failed")]
    Extraction {
        /// Engine message, verbatim.
        message: String,
    },
    /// The engine claimed success but no usable file exists.
    #[error("no usable output file was produced")]
    ArtifactNotFound {
        /// Workspace that was searched.
        workspace: PathBuf,
        /// Candidate that was rejected (zero bytes), if any.
        candidate: Option<PathBuf>,
    },
    /// The artifact could not be opened for streaming.
    #[error("failed to deliver artifact")]
    Delivery {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl DownloadError {
    /// Wrap an engine failure.
    #[must_use]
    pub fn extraction(error: &EngineError) -> Self {
        Self::Extraction {
            message: error.message(),
        }
    }

    /// Caller-facing description of the failure.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { source } => source.to_string(),
            Self::Extraction { message } => message.clone(),
            Self::ArtifactNotFound {
                candidate: Some(path),
                ..
            } => format!("output file missing or empty: {}", display_name(path)),
            Self::ArtifactNotFound { candidate: None, .. } => {
                "no output file was generated".to_string()
            }
            Self::Workspace { .. } | Self::Delivery { .. } => self.to_string(),
        }
    }

    /// Stable outcome label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Workspace { .. } => "workspace",
            Self::Extraction { .. } => "extraction",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::Delivery { .. } => "delivery",
        }
    }

    /// Whether the failure was caused by caller input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn engine_messages_pass_through_verbatim() {
        let reported = EngineError::Reported {
            message: "ERROR: video unavailable".to_string(),
        };
        let error = DownloadError::extraction(&reported);
        assert_eq!(error.detail(), "ERROR: video unavailable");
        assert_eq!(error.kind(), "extraction");
        assert!(!error.is_client_error());
    }

    #[test]
    fn engine_error_messages_describe_failure() {
        let spawn = EngineError::Spawn {
            program: "yt-dlp".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(spawn.message().starts_with("failed to start yt-dlp"));
        assert!(spawn.source().is_some());
        assert_eq!(
            EngineError::Timeout { seconds: 5 }.message(),
            "extraction timed out after 5s"
        );
        assert_eq!(
            EngineError::MalformedOutput {
                detail: "eof".to_string()
            }
            .message(),
            "failed to extract metadata"
        );
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let error = DownloadError::from(ValidationError::MissingUrl);
        assert!(error.is_client_error());
        assert_eq!(error.detail(), "provide a non-empty 'url'");
        assert_eq!(error.to_string(), "invalid download request");
    }

    #[test]
    fn artifact_not_found_detail_names_candidate() {
        let error = DownloadError::ArtifactNotFound {
            workspace: PathBuf::from("/tmp/dl-1"),
            candidate: Some(PathBuf::from("/tmp/dl-1/abc.mp3")),
        };
        assert_eq!(error.detail(), "output file missing or empty: abc.mp3");
        let empty = DownloadError::ArtifactNotFound {
            workspace: PathBuf::from("/tmp/dl-1"),
            candidate: None,
        };
        assert_eq!(empty.detail(), "no output file was generated");
        assert_eq!(empty.kind(), "artifact_not_found");
    }
}
