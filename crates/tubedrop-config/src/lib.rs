#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Service configuration loaded from the process environment.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment parsing), `error.rs`.

pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{EnvLookup, env_lookup};
pub use model::{
    CredentialSettings, DEFAULT_COOKIES_FILE, DEFAULT_ENGINE_TIMEOUT_SECS, DEFAULT_HTTP_PORT,
    DEFAULT_MAX_CONCURRENT_DOWNLOADS, EngineSettings, LogFormatPreference, ServiceConfig,
};
