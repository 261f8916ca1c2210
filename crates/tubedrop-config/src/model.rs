//! Typed configuration snapshot consumed by the bootstrap.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Port used when neither `PORT` nor `TUBEDROP_HTTP_PORT` is set.
pub const DEFAULT_HTTP_PORT: u16 = 5000;
/// Concurrent extraction ceiling used when unset.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;
/// Engine timeout used when unset.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 900;
/// Well-known mount point for a cookies secret.
pub const DEFAULT_COOKIES_FILE: &str = "/etc/secrets/cookies.txt";

/// Explicit log output preference; `None` in [`ServiceConfig`] lets the build decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatPreference {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

/// Extraction engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    /// Program invoked for extraction (resolved through `PATH` when relative).
    pub binary: PathBuf,
    /// Upper bound on a single engine run.
    pub timeout: Duration,
}

/// Where the optional credential bundle comes from.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSettings {
    /// Inline credential blob supplied through the environment.
    #[serde(skip_serializing)]
    pub inline: Option<String>,
    /// Mounted credential file.
    pub file: Option<PathBuf>,
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialSettings")
            .field("inline", &self.inline.as_ref().map(|_| "<redacted>"))
            .field("file", &self.file)
            .finish()
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    /// Interface the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// HTTP listener port.
    pub http_port: u16,
    /// Parent directory for per-request workspaces.
    pub workspace_root: PathBuf,
    /// Optional persisted downloads directory served by `/downloads/{name}`.
    pub downloads_dir: Option<PathBuf>,
    /// Ceiling on simultaneously running extractions.
    pub max_concurrent_downloads: usize,
    /// Engine settings.
    pub engine: EngineSettings,
    /// Credential source settings.
    pub credentials: CredentialSettings,
    /// Log format override.
    pub log_format: Option<LogFormatPreference>,
}

impl ServiceConfig {
    /// Socket address for the HTTP listener.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            workspace_root: std::env::temp_dir().join("tubedrop"),
            downloads_dir: None,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            engine: EngineSettings {
                binary: PathBuf::from("yt-dlp"),
                timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            },
            credentials: CredentialSettings {
                inline: None,
                file: Some(PathBuf::from(DEFAULT_COOKIES_FILE)),
            },
            log_format: None,
        }
    }
}
