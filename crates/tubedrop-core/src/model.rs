//! Download DTOs shared by the orchestrator, resolver, and HTTP layer.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Codec produced for audio requests.
pub const AUDIO_CODEC: &str = "mp3";
/// Target bitrate (kbps) for audio transcodes.
pub const AUDIO_BITRATE_KBPS: u32 = 192;
/// Container produced for video requests.
pub const VIDEO_CONTAINER: &str = "mp4";

/// Output format requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaFormat {
    /// Best audio-only stream, transcoded to [`AUDIO_CODEC`].
    #[serde(rename = "mp3")]
    Audio,
    /// Best audio+video streams, merged into [`VIDEO_CONTAINER`].
    #[default]
    #[serde(rename = "mp4")]
    Video,
}

impl MediaFormat {
    /// Normalise a wire token (`mp3` / `mp4`, any case, surrounding whitespace ignored).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Audio),
            "mp4" => Some(Self::Video),
            _ => None,
        }
    }

    /// Wire token for the format.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Video => "mp4",
        }
    }

    /// File extension of the artifact the engine is asked to produce.
    ///
    /// This is the transcode target, not the engine's native extension.
    #[must_use]
    pub const fn target_extension(self) -> &'static str {
        match self {
            Self::Audio => AUDIO_CODEC,
            Self::Video => VIDEO_CONTAINER,
        }
    }
}

impl Display for MediaFormat {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.token())
    }
}

/// Metadata reported by the extraction engine for the single item it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Engine-assigned opaque identifier of the remote content.
    pub id: String,
    /// Human-readable title; never used as an on-disk path component.
    pub title: String,
    /// Extension of the stream before any post-processing.
    pub native_extension: String,
}

impl ExtractionResult {
    /// File name the engine is expected to leave behind for `format`.
    #[must_use]
    pub fn expected_file_name(&self, format: MediaFormat) -> String {
        format!("{}.{}", self.id, format.target_extension())
    }
}

/// Resolved output file ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Absolute path to the file inside the request workspace.
    pub path: PathBuf,
    /// Size of the file in bytes; always non-zero for a resolved artifact.
    pub size_bytes: u64,
}

impl Artifact {
    /// Base name of the artifact, lossily converted to UTF-8.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
    }

    /// Extension of the artifact, if it has one.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }

    /// Borrow the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
