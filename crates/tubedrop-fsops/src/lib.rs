//! Request-scoped filesystem resources for the download pipeline.
//!
//! Layout: `workspace.rs` (per-request directories and their guard),
//! `credentials.rs` (cookie staging), `resolver.rs` (artifact lookup),
//! `staged.rs` (orchestrator to delivery hand-off), `error.rs`.
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

pub mod credentials;
pub mod error;
pub mod resolver;
pub mod staged;
pub mod workspace;

pub use credentials::{CREDENTIALS_DIR, CREDENTIALS_FILE, CredentialHandle, CredentialProvisioner};
pub use error::{FsOpsError, FsOpsResult};
pub use resolver::ArtifactResolver;
pub use staged::StagedArtifact;
pub use workspace::{WORKSPACE_PREFIX, Workspace, WorkspaceRoot, remove_workspace_dir};
