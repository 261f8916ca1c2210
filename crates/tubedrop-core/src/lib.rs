#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Engine-agnostic download model, request validation, and the extraction engine seam.
//!
//! Layout: `model.rs` (formats, results, artifacts), `request.rs` (inbound validation),
//! `engine.rs` (engine invocation + trait), `error.rs` (request failure taxonomy).

pub mod engine;
pub mod error;
pub mod model;
pub mod request;

pub use engine::{EngineInvocation, ExtractionEngine, FormatSelection, OUTPUT_TEMPLATE};
pub use error::{DownloadError, DownloadResult, EngineError, ValidationError};
pub use model::{
    AUDIO_BITRATE_KBPS, AUDIO_CODEC, Artifact, ExtractionResult, MediaFormat, VIDEO_CONTAINER,
};
pub use request::DownloadRequest;
