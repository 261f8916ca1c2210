//! Command-line construction for `yt-dlp`.

use std::ffi::OsString;

use tubedrop_core::{EngineInvocation, FormatSelection};

/// Arguments for one extraction run.
///
/// Metadata is printed as a single JSON document on stdout while the download
/// still happens (`--dump-json --no-simulate`); diagnostics go to stderr.
#[must_use]
pub fn build_args(invocation: &EngineInvocation) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(20);
    if invocation.single_item_only {
        args.push("--no-playlist".into());
    }
    args.extend(
        [
            "--no-progress",
            "--no-warnings",
            "--quiet",
            "--dump-json",
            "--no-simulate",
        ]
        .map(OsString::from),
    );
    args.push("-o".into());
    args.push(invocation.output_template.clone().into_os_string());
    args.push("-f".into());
    args.push(invocation.selection.selector().into());

    match &invocation.selection {
        FormatSelection::Audio {
            codec,
            bitrate_kbps,
            ..
        } => {
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push((*codec).into());
            args.push("--audio-quality".into());
            args.push(format!("{bitrate_kbps}K").into());
        }
        FormatSelection::Video { container, .. } => {
            args.push("--merge-output-format".into());
            args.push((*container).into());
        }
    }

    if let Some(cookies) = &invocation.credential_file {
        args.push("--cookies".into());
        args.push(cookies.clone().into_os_string());
    }

    args.push("--".into());
    args.push(invocation.url.clone().into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tubedrop_core::{DownloadRequest, MediaFormat};

    fn rendered(invocation: &EngineInvocation) -> Vec<String> {
        build_args(invocation)
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn window(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|idx| args.get(idx + 1).cloned())
    }

    #[test]
    fn audio_args_request_mp3_transcode() -> anyhow::Result<()> {
        let request = DownloadRequest::new("https://example.test/watch?v=1", MediaFormat::Audio)?;
        let invocation = EngineInvocation::for_request(&request, Path::new("/work/dl-1"), None);
        let args = rendered(&invocation);

        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(window(&args, "-f").as_deref(), Some("bestaudio/best"));
        assert_eq!(window(&args, "--audio-format").as_deref(), Some("mp3"));
        assert_eq!(window(&args, "--audio-quality").as_deref(), Some("192K"));
        assert_eq!(
            window(&args, "-o").as_deref(),
            Some("/work/dl-1/%(id)s.%(ext)s")
        );
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
        Ok(())
    }

    #[test]
    fn video_args_merge_into_mp4_with_cookies() -> anyhow::Result<()> {
        let request = DownloadRequest::new("https://example.test/v", MediaFormat::Video)?;
        let cookies = PathBuf::from("/work/dl-1/.credentials/cookies.txt");
        let invocation =
            EngineInvocation::for_request(&request, Path::new("/work/dl-1"), Some(cookies));
        let args = rendered(&invocation);

        assert_eq!(
            window(&args, "-f").as_deref(),
            Some("bestvideo+bestaudio/best")
        );
        assert_eq!(window(&args, "--merge-output-format").as_deref(), Some("mp4"));
        assert_eq!(
            window(&args, "--cookies").as_deref(),
            Some("/work/dl-1/.credentials/cookies.txt")
        );
        assert!(!args.contains(&"-x".to_string()));
        Ok(())
    }

    #[test]
    fn url_follows_option_terminator() -> anyhow::Result<()> {
        let request = DownloadRequest::new("-not-a-flag", MediaFormat::Video)?;
        let invocation = EngineInvocation::for_request(&request, Path::new("/w"), None);
        let args = rendered(&invocation);
        let tail = &args[args.len() - 2..];
        assert_eq!(tail, ["--", "-not-a-flag"]);
        Ok(())
    }
}
