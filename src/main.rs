//! # subclipper
//!
//! Browse a media library, search across the subtitles of every file in it,
//! and cut short looping clips.
//!
//! Every invocation starts the library scan in the background: files that are
//! not cached yet have their subtitles extracted while the command runs.
//! Queries answer from whatever is cached so far, unless `--wait` is given.
//!
//! ```bash
//! subclipper scan
//! subclipper search "hello there" --path "Show/Season 1/"
//! subclipper clip --subtitle 53686f772f... --format gif
//! ```

mod app;
mod commands;
mod error;

use crate::app::App;
use crate::commands::ClipTarget;
use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use subclipper_config::Config;
use subclipper_render::ClipRequest;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "subclipper", version, about)]
struct Cli {
    /// Path to a TOML config file (default: subclipper.toml in the platform
    /// configuration directory)
    #[arg(short, long, global = true, env = "SUBCLIPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Log more (repeat for even more); overridden by RUST_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Wait for the library scan to finish before answering
    #[arg(long, global = true)]
    wait: bool,

    /// Do not scan the library; answer from the existing cache only
    #[arg(long, global = true, conflicts_with = "wait")]
    no_scan: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the whole library, showing progress, and exit when done
    Scan {
        /// Do not show progress
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show cache statistics
    Status,
    /// Search subtitles by text
    Search {
        /// Text the subtitle must contain (empty matches everything)
        #[arg(default_value = "")]
        text: String,
        /// Only search files whose path starts with this prefix
        #[arg(short, long, default_value = "")]
        path: String,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Results per page (default: from configuration)
        #[arg(long)]
        page_length: Option<usize>,
    },
    /// Find the page of an unfiltered search holding a subtitle
    Locate {
        id: String,
        #[arg(long)]
        page_length: Option<usize>,
    },
    /// Show one subtitle, or every subtitle of one file
    Show {
        #[arg(required_unless_present = "video")]
        id: Option<String>,
        /// Show every subtitle of this file instead
        #[arg(long, conflicts_with = "id")]
        video: Option<String>,
    },
    /// Print the directory tree of the library
    Tree {
        #[arg(default_value = "")]
        subpath: String,
    },
    /// Drop a file's cached subtitles so the next scan extracts them again
    Forget { video: String },
    /// Render a short clip
    Clip(ClipArgs),
}

impl Command {
    /// Commands answered from the cache, which benefit from a fresh scan.
    fn reads_cache(&self) -> bool {
        matches!(self, Self::Status | Self::Search { .. } | Self::Locate { .. } | Self::Show { .. })
    }
}

#[derive(clap::Args)]
struct ClipArgs {
    /// Start from this subtitle's file, timing and text
    #[arg(short, long)]
    subtitle: Option<String>,
    /// Source file, relative to the library root
    #[arg(long, required_unless_present = "subtitle")]
    video: Option<String>,
    /// Start time in seconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// End time in seconds
    #[arg(long, default_value_t = 0.0)]
    end: f64,
    /// Text burnt into the bottom of the clip
    #[arg(long, default_value = "")]
    text: String,
    /// Text burnt into the top of the clip
    #[arg(long, default_value = "")]
    caption: String,
    #[arg(long)]
    crop: bool,
    #[arg(long)]
    boomerang: bool,
    #[arg(long)]
    colour: bool,
    #[arg(long, default_value_t = 500)]
    resolution: u32,
    #[arg(long, default_value_t = 20)]
    font_size: u32,
    #[arg(long, default_value = "webp", value_parser = commands::parse_format)]
    format: String,
    /// Where to save the clip (default: clip.<format> in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}
impl ClipArgs {
    fn into_parts(self) -> (ClipRequest, ClipTarget) {
        let request = ClipRequest {
            start: self.start,
            end: self.end,
            text: self.text,
            caption: self.caption,
            crop: self.crop,
            boomerang: self.boomerang,
            colour: self.colour,
            resolution: self.resolution,
            font_size: self.font_size,
            format: self.format,
            video_id: self.video.unwrap_or_default(),
            subtitle_id: None,
        };
        (request, ClipTarget { subtitle: self.subtitle, output: self.output })
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info,sqlx=warn",
        1 => "debug,sqlx=info",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let app = App::build(config).await?;
    let result = execute(&app, cli.command, Scanning::from_flags(cli.wait, cli.no_scan)).await;
    app.close().await;
    result
}

/// What read commands do with the background scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scanning {
    Skip,
    Background,
    Wait,
}
impl Scanning {
    fn from_flags(wait: bool, no_scan: bool) -> Self {
        match (wait, no_scan) {
            (_, true) => Self::Skip,
            (true, false) => Self::Wait,
            (false, false) => Self::Background,
        }
    }
}

async fn execute(app: &App, command: Command, scanning: Scanning) -> Result<()> {
    if let Command::Scan { quiet } = command {
        return commands::scan(app, quiet).await;
    }
    if command.reads_cache() && scanning != Scanning::Skip {
        match (app.start_scan(), scanning) {
            (Some(task), Scanning::Wait) => {
                task.await.or_raise(|| ErrorKind::Command("library scan did not finish".to_string()))?;
            },
            (None, Scanning::Wait) => tracing::warn!("Cannot wait for a scan that could not start"),
            _ => {},
        }
    }
    match command {
        Command::Scan { .. } => Ok(()),
        Command::Status => commands::status(app).await,
        Command::Search { text, path, page, page_length } => {
            commands::search(app, &path, &text, page.saturating_sub(1), page_length).await
        },
        Command::Locate { id, page_length } => commands::locate(app, &id, page_length).await,
        Command::Show { id, video } => commands::show(app, id.as_deref(), video.as_deref()).await,
        Command::Tree { subpath } => commands::tree(app, &subpath).await,
        Command::Forget { video } => commands::forget(app, &video).await,
        Command::Clip(args) => {
            let (request, target) = args.into_parts();
            commands::clip(app, request, target).await
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            err.exit_code()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clip_args() {
        let cli = Cli::try_parse_from(["subclipper", "clip", "--video", "a.mkv", "--end", "2.5", "--format", "GIF"]).unwrap();
        let Command::Clip(args) = cli.command else { panic!("expected clip") };
        let (request, target) = args.into_parts();
        assert_eq!(request.video_id, "a.mkv");
        assert_eq!(request.end, 2.5);
        assert_eq!(request.format, "gif");
        assert!(target.subtitle.is_none());
    }

    #[test]
    fn test_clip_requires_a_source() {
        assert!(Cli::try_parse_from(["subclipper", "clip", "--end", "2"]).is_err());
        assert!(Cli::try_parse_from(["subclipper", "clip", "--format", "mp4", "--video", "a.mkv"]).is_err());
    }

    #[test]
    fn test_scanning_flags() {
        assert_eq!(Scanning::from_flags(false, false), Scanning::Background);
        assert_eq!(Scanning::from_flags(true, false), Scanning::Wait);
        assert_eq!(Scanning::from_flags(false, true), Scanning::Skip);
    }

    #[test]
    fn test_wait_conflicts_with_no_scan() {
        assert!(Cli::try_parse_from(["subclipper", "--wait", "--no-scan", "status"]).is_err());
    }
}
