//! `tubedrop download`: post a request and stream the attachment to disk.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use serde_json::json;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::cli::DownloadArgs;
use crate::client::{AppContext, CliError, CliResult, classify_problem};

const FALLBACK_FILE_NAME: &str = "download";

/// Download `args.url` and return the path of the saved file.
pub(crate) async fn handle_download(ctx: &AppContext, args: DownloadArgs) -> CliResult<PathBuf> {
    if args.url.trim().is_empty() {
        return Err(CliError::validation("url must not be empty"));
    }

    let response = ctx
        .client
        .post(ctx.endpoint("/download")?)
        .json(&json!({ "url": args.url, "format": args.format.token() }))
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /download failed: {err}")))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let name = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(attachment_file_name)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    let target = args.output_dir.join(&name);
    let partial = args.output_dir.join(format!("{name}.part"));

    let mut file = File::create(&partial).await.map_err(|err| {
        CliError::failure(anyhow!("failed to create {}: {err}", partial.display()))
    })?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                discard(&partial).await;
                return Err(CliError::failure(anyhow!("download interrupted: {err}")));
            }
        };
        if let Err(err) = file.write_all(&chunk).await {
            discard(&partial).await;
            return Err(CliError::failure(anyhow!(
                "failed to write {}: {err}",
                partial.display()
            )));
        }
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to flush {}: {err}", partial.display())))?;
    drop(file);

    fs::rename(&partial, &target).await.map_err(|err| {
        CliError::failure(anyhow!("failed to move download into {}: {err}", target.display()))
    })?;
    debug!(path = %target.display(), written, "download saved");
    Ok(target)
}

async fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        debug!(error = %err, path = %path.display(), "failed to remove partial download");
    }
}

/// File name from a `Content-Disposition` value, preferring the RFC 5987 `filename*`.
///
/// Only the final path component is kept.
pub(crate) fn attachment_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_extended(value.trim()),
            "filename" => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }
    extended.or(plain).and_then(|name| safe_file_name(&name))
}

fn decode_extended(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_language, encoded) = rest.split_once('\'')?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|name| name.into_owned())
}

fn safe_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}
