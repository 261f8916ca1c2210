#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Tubedrop application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `orchestrator.rs` (extraction pipeline), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Extraction pipeline behind `POST /download`.
pub mod orchestrator;

pub use bootstrap::{build_server, run_app};
pub use error::{AppError, AppResult};
pub use orchestrator::DownloadOrchestrator;
