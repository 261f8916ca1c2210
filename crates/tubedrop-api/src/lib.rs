#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! HTTP surface for Tubedrop.
//!
//! Layout: `workflow.rs` (seam to the download pipeline), `models.rs` (wire DTOs),
//! `http/` (router, handlers, delivery streaming, problem responses), `error.rs`.

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;
pub mod workflow;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::{ApiOptions, ApiServer};
pub use models::{HealthResponse, ProblemDetails};
pub use workflow::{DownloadWorkflow, SharedWorkflow};
