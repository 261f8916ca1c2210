//! Interpretation of `yt-dlp` stdout and stderr.

use serde::Deserialize;
use tubedrop_core::{EngineError, ExtractionResult};

#[derive(Debug, Deserialize)]
struct InfoDocument {
    id: Option<String>,
    title: Option<String>,
    ext: Option<String>,
}

/// Parse the info document printed by `--dump-json`.
///
/// The last non-empty line that parses as a JSON object wins; a document without a
/// non-empty `id` is rejected.
///
/// # Errors
///
/// Returns [`EngineError::MalformedOutput`] when no usable document is present.
pub fn parse_info(stdout: &[u8]) -> Result<ExtractionResult, EngineError> {
    let text = String::from_utf8_lossy(stdout);
    let document = text
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<InfoDocument>(line).ok())
        .ok_or_else(|| EngineError::MalformedOutput {
            detail: "no info document on stdout".to_string(),
        })?;

    let id = document
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::MalformedOutput {
            detail: "info document has no id".to_string(),
        })?;
    let title = document
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| id.clone());
    Ok(ExtractionResult {
        id,
        title,
        native_extension: document.ext.unwrap_or_default(),
    })
}

/// Caller-facing failure message from stderr.
///
/// Keeps only `ERROR:` lines when present, otherwise the trimmed stderr.
#[must_use]
pub fn failure_message(stderr: &[u8], exit_code: Option<i32>) -> String {
    let text = String::from_utf8_lossy(stderr);
    let errors: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    exit_code.map_or_else(
        || "extraction engine terminated by signal".to_string(),
        |code| format!("extraction engine exited with status {code}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_info_document() -> Result<(), EngineError> {
        let stdout = b"[youtube] noise\n{\"id\":\"video123\",\"title\":\"Song\",\"ext\":\"webm\",\"duration\":12}\n";
        let result = parse_info(stdout)?;
        assert_eq!(result.id, "video123");
        assert_eq!(result.title, "Song");
        assert_eq!(result.native_extension, "webm");
        Ok(())
    }

    #[test]
    fn missing_title_falls_back_to_id() -> Result<(), EngineError> {
        let result = parse_info(br#"{"id":"abc","title":"  "}"#)?;
        assert_eq!(result.title, "abc");
        assert_eq!(result.native_extension, "");
        Ok(())
    }

    #[test]
    fn missing_or_blank_id_is_malformed() {
        for stdout in [&b""[..], b"not json", br#"{"title":"x"}"#, br#"{"id":" "}"#] {
            let outcome = parse_info(stdout);
            assert!(matches!(outcome, Err(EngineError::MalformedOutput { .. })));
        }
    }

    #[test]
    fn failure_message_prefers_error_lines() {
        let stderr = b"WARNING: throttled\nERROR: [youtube] abc: Video unavailable\n";
        assert_eq!(
            failure_message(stderr, Some(1)),
            "ERROR: [youtube] abc: Video unavailable"
        );
        assert_eq!(failure_message(b"  boom \n", Some(2)), "boom");
        assert_eq!(
            failure_message(b"", Some(2)),
            "extraction engine exited with status 2"
        );
        assert_eq!(
            failure_message(b"", None),
            "extraction engine terminated by signal"
        );
    }
}
