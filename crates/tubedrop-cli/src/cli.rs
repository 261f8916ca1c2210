//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, parse_url};
use crate::commands::download::handle_download;
use crate::commands::health::handle_health;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Parses CLI arguments and executes the requested command. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();

    match dispatch(cli, &trace_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<()> {
    let ctx = AppContext::new(cli.api_url, cli.timeout, trace_id)?;
    match cli.command {
        Command::Download(args) => {
            let saved = handle_download(&ctx, args).await?;
            println!("{}", saved.display());
            Ok(())
        }
        Command::Health => handle_health(&ctx).await,
    }
}

#[derive(Parser)]
#[command(name = "tubedrop", about = "Download media through a Tubedrop server")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "TUBEDROP_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    /// Overall request timeout in seconds; 0 disables it.
    #[arg(long, global = true, env = "TUBEDROP_HTTP_TIMEOUT_SECS", default_value_t = 0)]
    pub(crate) timeout: u64,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download a URL and save the attachment locally.
    Download(DownloadArgs),
    /// Print the server health document.
    Health,
}

#[derive(Args, Debug)]
pub(crate) struct DownloadArgs {
    /// Media page URL.
    pub(crate) url: String,
    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Mp4)]
    pub(crate) format: FormatArg,
    /// Directory the attachment is written to.
    #[arg(long, default_value = ".")]
    pub(crate) output_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    Mp3,
    Mp4,
}

impl FormatArg {
    pub(crate) const fn token(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
        }
    }
}
