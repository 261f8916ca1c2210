//! Inbound request validation.
//!
//! # Design
//! - Pure functions only; nothing here touches the filesystem or the engine.
//! - Absent (or `null`) `format` defaults to video; any explicit value must be a known token.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::model::MediaFormat;

/// Validated download request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    format: MediaFormat,
}

impl DownloadRequest {
    /// Build a request from already-separated parts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingUrl`] when `url` is blank.
    pub fn new(url: impl Into<String>, format: MediaFormat) -> Result<Self, ValidationError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        Ok(Self {
            url: trimmed.to_string(),
            format,
        })
    }

    /// Parse and validate a raw JSON request body.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the body is not a JSON object, the URL is
    /// missing or blank, or an explicit format is not one of the recognised tokens.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)?;
        let Value::Object(fields) = value else {
            return Err(ValidationError::MalformedBody);
        };

        let url = match fields.get("url") {
            Some(Value::String(url)) => url.as_str(),
            _ => return Err(ValidationError::MissingUrl),
        };
        let format = parse_format(&fields)?;
        Self::new(url, format)
    }

    /// Remote media URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requested output format.
    #[must_use]
    pub const fn format(&self) -> MediaFormat {
        self.format
    }
}

fn parse_format(fields: &Map<String, Value>) -> Result<MediaFormat, ValidationError> {
    match fields.get("format") {
        None | Some(Value::Null) => Ok(MediaFormat::default()),
        Some(Value::String(raw)) => {
            MediaFormat::from_token(raw).ok_or_else(|| ValidationError::InvalidFormat {
                value: raw.clone(),
            })
        }
        Some(other) => Err(ValidationError::InvalidFormat {
            value: other.to_string(),
        }),
    }
}
