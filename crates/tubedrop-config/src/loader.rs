//! Environment parsing for [`ServiceConfig`].
//!
//! # Design
//! - Parsing goes through an injectable lookup so tests never mutate the process environment.
//! - Blank values are treated as unset.
//! - Every rejected value reports the variable name and a machine-readable reason.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{LogFormatPreference, ServiceConfig};

const ENV_BIND_ADDR: &str = "TUBEDROP_BIND_ADDR";
const ENV_HTTP_PORT: &str = "TUBEDROP_HTTP_PORT";
const ENV_PORT: &str = "PORT";
const ENV_WORKSPACE_ROOT: &str = "TUBEDROP_WORKSPACE_ROOT";
const ENV_DOWNLOADS_DIR: &str = "TUBEDROP_DOWNLOADS_DIR";
const ENV_MAX_CONCURRENT: &str = "TUBEDROP_MAX_CONCURRENT_DOWNLOADS";
const ENV_YTDLP_BIN: &str = "TUBEDROP_YTDLP_BIN";
const ENV_ENGINE_TIMEOUT: &str = "TUBEDROP_ENGINE_TIMEOUT_SECS";
const ENV_COOKIES: &str = "TUBEDROP_COOKIES";
const ENV_COOKIES_FILE: &str = "TUBEDROP_COOKIES_FILE";
const ENV_LOG_FORMAT: &str = "TUBEDROP_LOG_FORMAT";

/// Source of configuration values keyed by environment variable name.
pub trait EnvLookup {
    /// Return the raw value for `name`, if set.
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Lookup backed by the process environment.
#[must_use]
pub fn env_lookup() -> impl EnvLookup {
    |name: &str| std::env::var(name).ok()
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unparseable or out-of-range value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&env_lookup())
    }

    /// Load configuration from an arbitrary lookup, starting from [`ServiceConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unparseable or out-of-range value.
    pub fn from_lookup(lookup: &impl EnvLookup) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = value(lookup, ENV_BIND_ADDR) {
            config.bind_addr = raw
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::invalid(ENV_BIND_ADDR, "not_an_ip_address", &raw))?;
        }

        if let Some((field, raw)) = value(lookup, ENV_HTTP_PORT)
            .map(|raw| (ENV_HTTP_PORT, raw))
            .or_else(|| value(lookup, ENV_PORT).map(|raw| (ENV_PORT, raw)))
        {
            config.http_port = parse_port(field, &raw)?;
        }

        if let Some(raw) = value(lookup, ENV_WORKSPACE_ROOT) {
            config.workspace_root = PathBuf::from(raw);
        }
        config.downloads_dir = value(lookup, ENV_DOWNLOADS_DIR).map(PathBuf::from);

        if let Some(raw) = value(lookup, ENV_MAX_CONCURRENT) {
            config.max_concurrent_downloads = parse_positive(ENV_MAX_CONCURRENT, &raw)?;
        }

        if let Some(raw) = value(lookup, ENV_YTDLP_BIN) {
            config.engine.binary = PathBuf::from(raw);
        }
        if let Some(raw) = value(lookup, ENV_ENGINE_TIMEOUT) {
            let seconds = parse_positive(ENV_ENGINE_TIMEOUT, &raw)?;
            config.engine.timeout = Duration::from_secs(seconds);
        }

        config.credentials.inline = lookup.get(ENV_COOKIES).filter(|raw| !raw.trim().is_empty());
        if let Some(raw) = value(lookup, ENV_COOKIES_FILE) {
            config.credentials.file = Some(PathBuf::from(raw));
        }

        if let Some(raw) = value(lookup, ENV_LOG_FORMAT) {
            config.log_format = Some(parse_log_format(&raw)?);
        }

        debug!(
            listen_addr = %config.listen_addr(),
            workspace_root = %config.workspace_root.display(),
            max_concurrent_downloads = config.max_concurrent_downloads,
            "service configuration loaded"
        );
        Ok(config)
    }
}

fn value(lookup: &impl EnvLookup, name: &str) -> Option<String> {
    lookup
        .get(name)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_port(field: &'static str, raw: &str) -> ConfigResult<u16> {
    let port = raw
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, "out_of_range", raw))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(port)
}

fn parse_positive<T>(field: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr + PartialEq + From<u8>,
{
    let parsed = raw
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", raw))?;
    if parsed == T::from(0) {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(parsed)
}

fn parse_log_format(raw: &str) -> ConfigResult<LogFormatPreference> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormatPreference::Json),
        "pretty" | "text" => Ok(LogFormatPreference::Pretty),
        _ => Err(ConfigError::invalid(ENV_LOG_FORMAT, "unknown_format", raw)),
    }
}
