use clap::{Args, Parser, Subcommand};

use crate::types::{LogLevel, LogParsePolicy};

#[derive(Parser, Debug)]
#[command(
    name = "canvas-sync",
    version,
    about = "Download Canvas course files into a local directory"
)]
pub struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments for the implicit `sync` when no subcommand is given
    #[command(flatten)]
    pub sync: SyncArgs,
}

impl Cli {
    /// The subcommand to run; a bare invocation means `sync`.
    pub fn effective_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Sync(self.sync.clone()))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download new and changed files (default)
    Sync(SyncArgs),
    /// Print the courses visible to the token
    ListCourses(CanvasArgs),
    /// Show the sync log location and entry count
    Status(StateArgs),
    /// Delete the sync log so the next sync downloads everything again
    ResetState(ResetStateArgs),
}

/// Connection settings.
#[derive(Args, Debug, Clone)]
pub struct CanvasArgs {
    /// Canvas base URL, e.g. https://canvas.example.edu
    #[arg(long, env = "CANVAS_URL")]
    pub url: Option<String>,

    /// Canvas access token.
    /// WARNING: passing via --token is visible in process listings.
    /// Prefer the CANVAS_TOKEN environment variable instead.
    #[arg(long, env = "CANVAS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Records requested per page
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Max retries per request on rate limits, server errors and network failures (0 = no retries)
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay in seconds between retries (doubles each attempt)
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,
}

/// Where files and the sync log live.
#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Local directory for downloads
    #[arg(short = 'd', long, env = "SAVE_TO")]
    pub directory: Option<String>,

    /// Sync log location (default: <directory>/.files)
    #[arg(long)]
    pub log_file: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub canvas: CanvasArgs,

    #[command(flatten)]
    pub state: StateArgs,

    /// Comma-separated course codes to sync (default: all courses)
    #[arg(long, env = "CANVAS_COURSES")]
    pub courses: Option<String>,

    /// How to treat unparseable lines in the sync log
    #[arg(long, value_enum, default_value = "skip-line")]
    pub log_parse_policy: LogParsePolicy,
}

#[derive(Args, Debug, Clone)]
pub struct ResetStateArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}
