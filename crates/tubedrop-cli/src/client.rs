//! Shared client utilities and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tubedrop_api::ProblemDetails;
use url::Url;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
}

impl AppContext {
    /// Build the HTTP client, tagging every request with `trace_id`.
    ///
    /// No overall timeout is set when `timeout_secs` is zero; extractions can run for minutes.
    pub(crate) fn new(base_url: Url, timeout_secs: u64, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let mut builder = Client::builder().default_headers(default_headers);
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, base_url })
    }

    pub(crate) fn endpoint(&self, path: &str) -> CliResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| CliError::failure(anyhow!("invalid endpoint '{path}': {err}")))
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Classify a non-success response into a CLI error.
///
/// Problem documents render as `<title>: <detail>`; 4xx responses are validation errors.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = match problem {
        Some(ProblemDetails {
            title,
            detail: Some(detail),
            ..
        }) => format!("{title}: {detail}"),
        Some(ProblemDetails { title, .. }) => title,
        None => {
            let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
            if body_text.is_empty() {
                format!("request failed with status {status}")
            } else {
                format!("{body_text} (status {status})")
            }
        }
    };

    if status.is_client_error() && status != StatusCode::NOT_FOUND {
        CliError::validation(message)
    } else {
        CliError::failure(anyhow!(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    async fn fetch(server: &MockServer) -> anyhow::Result<reqwest::Response> {
        Ok(Client::new().get(server.url("/problem")).send().await?)
    }

    #[tokio::test]
    async fn bad_request_problem_is_validation() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/problem");
            then.status(400).json_body(serde_json::json!({
                "type": "https://tubedrop.dev/problems/bad-request",
                "title": "invalid download request",
                "status": 400,
                "detail": "provide a non-empty 'url'"
            }));
        });

        let error = classify_problem(fetch(&server).await?).await;
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.display_message(),
            "invalid download request: provide a non-empty 'url'"
        );
        Ok(())
    }

    #[tokio::test]
    async fn server_problem_is_failure() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/problem");
            then.status(500).json_body(serde_json::json!({
                "type": "https://tubedrop.dev/problems/extraction-failed",
                "title": "extraction failed",
                "status": 500,
                "detail": "video unavailable"
            }));
        });

        let error = classify_problem(fetch(&server).await?).await;
        assert_eq!(error.exit_code(), 3);
        assert_eq!(error.display_message(), "extraction failed: video unavailable");
        Ok(())
    }

    #[tokio::test]
    async fn plain_body_is_reported_with_status() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/problem");
            then.status(502).body("bad gateway");
        });

        let error = classify_problem(fetch(&server).await?).await;
        assert_eq!(error.exit_code(), 3);
        assert!(error.display_message().starts_with("bad gateway (status 502"));
        Ok(())
    }

    #[test]
    fn parse_url_rejects_garbage() {
        assert!(parse_url("http://127.0.0.1:5000").is_ok());
        assert!(parse_url("not a url").is_err());
    }
}
