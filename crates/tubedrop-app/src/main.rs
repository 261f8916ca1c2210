#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic)]

//! Binary entrypoint that wires the Tubedrop services together and serves the API.

use tubedrop_app::{AppResult, run_app};

/// Bootstraps the Tubedrop service and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
