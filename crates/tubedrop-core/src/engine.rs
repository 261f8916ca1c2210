//! Extraction engine seam implemented by adapters (e.g. `yt-dlp`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::model::{
    AUDIO_BITRATE_KBPS, AUDIO_CODEC, ExtractionResult, MediaFormat, VIDEO_CONTAINER,
};
use crate::request::DownloadRequest;

/// Output template handed to the engine, relative to the workspace.
///
/// Keyed by the engine identifier so remote titles never become path components.
pub const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

const AUDIO_SELECTOR: &str = "bestaudio/best";
const VIDEO_SELECTOR: &str = "bestvideo+bestaudio/best";

/// Stream selection and post-processing requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelection {
    /// Pure-audio stream transcoded to a fixed codec.
    Audio {
        /// Engine format selector.
        selector: &'static str,
        /// Target audio codec.
        codec: &'static str,
        /// Target bitrate in kbps.
        bitrate_kbps: u32,
    },
    /// Audio+video streams merged into a fixed container.
    Video {
        /// Engine format selector.
        selector: &'static str,
        /// Target container.
        container: &'static str,
    },
}

impl FormatSelection {
    /// Selection used for the given output format.
    #[must_use]
    pub const fn for_format(format: MediaFormat) -> Self {
        match format {
            MediaFormat::Audio => Self::Audio {
                selector: AUDIO_SELECTOR,
                codec: AUDIO_CODEC,
                bitrate_kbps: AUDIO_BITRATE_KBPS,
            },
            MediaFormat::Video => Self::Video {
                selector: VIDEO_SELECTOR,
                container: VIDEO_CONTAINER,
            },
        }
    }

    /// Engine format selector string.
    #[must_use]
    pub const fn selector(&self) -> &'static str {
        match self {
            Self::Audio { selector, .. } | Self::Video { selector, .. } => selector,
        }
    }
}

/// Fully resolved engine configuration for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    /// Remote media URL.
    pub url: String,
    /// Directory the engine must write into (the request workspace).
    pub output_dir: PathBuf,
    /// Absolute output template inside `output_dir`.
    pub output_template: PathBuf,
    /// Always `true`: playlists are never traversed.
    pub single_item_only: bool,
    /// Stream selection and post-processing.
    pub selection: FormatSelection,
    /// Request-scoped credential file, when one was provisioned.
    pub credential_file: Option<PathBuf>,
}

impl EngineInvocation {
    /// Build the invocation for a validated request writing into `output_dir`.
    #[must_use]
    pub fn for_request(
        request: &DownloadRequest,
        output_dir: &Path,
        credential_file: Option<PathBuf>,
    ) -> Self {
        Self {
            url: request.url().to_string(),
            output_dir: output_dir.to_path_buf(),
            output_template: output_dir.join(OUTPUT_TEMPLATE),
            single_item_only: true,
            selection: FormatSelection::for_format(request.format()),
            credential_file,
        }
    }
}

/// External capability that resolves a URL and produces one local media file.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Download (and post-process) the single item behind `invocation.url`.
    ///
    /// Implementations must only write inside `invocation.output_dir`.
    async fn extract(&self, invocation: &EngineInvocation)
    -> Result<ExtractionResult, EngineError>;
}
