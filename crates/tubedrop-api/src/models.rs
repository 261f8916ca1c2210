//! Wire DTOs shared with the CLI.

use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short constant summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Request-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving.
    pub status: String,
    /// Build identifier.
    pub build: String,
    /// Downloads currently extracting or resolving.
    pub downloads_in_flight: i64,
}
