#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::pedantic)]

//! Shared test helpers used across crate and integration suites.
//! Layout: fixtures.rs (workspace-root inspection), mocks.rs (scripted extraction engine).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{count_workspaces, workspace_dirs};
pub use mocks::ScriptedEngine;
