//! canvas-sync: keeps a local copy of the files in your Canvas LMS courses.
//!
//! Each run lists courses, folders and files through the Canvas REST API,
//! downloads files that are new or whose `modified_at` changed, and records
//! what is on disk in a plain-text sync log (`<directory>/.files`) so the next
//! run only fetches what changed.

#![warn(clippy::all)]

mod canvas;
mod cli;
mod config;
mod download;
mod events;
pub mod retry;
mod shutdown;
mod state;
mod types;

use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use clap::Parser;
use fs4::fs_std::FileExt;
use tracing_subscriber::EnvFilter;

use canvas::{CanvasClient, RemoteApi};
use cli::Command;
use config::{Config, RemoteConfig, StateLocation};
use events::TracingSink;
use state::SyncLog;
use types::LogParsePolicy;

/// Take the exclusive run lock next to the sync log. The lock is held until
/// the returned file is dropped.
async fn acquire_run_lock(location: &StateLocation) -> anyhow::Result<std::fs::File> {
    let lock_path = location.lock_path();
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::create(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;
        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another canvas-sync run is using this sync log (lock: {})",
                lock_path.display()
            )
        })?;
        Ok::<std::fs::File, anyhow::Error>(file)
    })
    .await?
}

/// Run the sync command.
async fn run_sync(args: cli::SyncArgs) -> anyhow::Result<()> {
    let config = Config::from_cli(args)?;
    tracing::debug!(?config, "Resolved configuration");
    tracing::info!(
        "Syncing {} into {}",
        config.remote.url,
        config::display_path(&config.location.root)
    );

    let _lock = acquire_run_lock(&config.location).await?;
    let client = CanvasClient::new(
        &config.remote.url,
        &config.remote.token,
        &config.remote.client,
    )?;
    let shutdown_token = shutdown::install_signal_handler();

    let report = download::sync(&client, &config.sync_settings(), &TracingSink, shutdown_token)
        .await?;

    if report.interrupted {
        tracing::info!("Sync interrupted; remaining files will be fetched next run");
    }
    if report.error_count() > 0 {
        anyhow::bail!(
            "{} error(s) during sync; failed files will be retried next run",
            report.error_count()
        );
    }
    Ok(())
}

/// Run the list-courses command.
async fn run_list_courses(args: cli::CanvasArgs) -> anyhow::Result<()> {
    let remote = RemoteConfig::from_args(&args)?;
    let client = CanvasClient::new(&remote.url, &remote.token, &remote.client)?;
    let courses = client.list_containers().await?;

    if courses.is_empty() {
        println!("No courses visible to this token.");
        return Ok(());
    }
    let width = courses.iter().map(|c| c.code.len()).max().unwrap_or(0);
    for course in &courses {
        println!("{:<width$}  {}", course.code, course.name, width = width);
    }
    Ok(())
}

/// Run the status command.
async fn run_status(args: cli::StateArgs) -> anyhow::Result<()> {
    let location = StateLocation::from_args(&args)?;

    println!("Download directory: {}", location.root.display());
    if !location.log_path.exists() {
        println!("No sync log found at {}", location.log_path.display());
        println!("Run a sync first to create it.");
        return Ok(());
    }

    let log = SyncLog::load(&location.log_path, LogParsePolicy::SkipLine).await;
    println!("Sync log:           {}", location.log_path.display());
    if log.is_empty() {
        println!("Files recorded:     none");
    } else {
        println!("Files recorded:     {}", log.len());
    }
    Ok(())
}

/// Run the reset-state command.
async fn run_reset_state(args: cli::ResetStateArgs) -> anyhow::Result<()> {
    let location = StateLocation::from_args(&args.state)?;
    let log_path = &location.log_path;

    if !log_path.exists() {
        println!("No sync log found at {}", log_path.display());
        return Ok(());
    }

    if !args.yes && !confirm(log_path)? {
        println!("Cancelled.");
        return Ok(());
    }

    let _lock = acquire_run_lock(&location).await?;
    std::fs::remove_file(log_path)
        .with_context(|| format!("Failed to delete {}", log_path.display()))?;
    println!("Sync log deleted. The next sync will download every file again.");
    Ok(())
}

fn confirm(log_path: &Path) -> anyhow::Result<bool> {
    println!("This will delete the sync log at:");
    println!("  {}", log_path.display());
    println!();
    print!("Are you sure? [y/N] ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before clap, so CANVAS_URL and friends can come from .env.
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    match cli.effective_command() {
        Command::Sync(args) => run_sync(args).await,
        Command::ListCourses(args) => run_list_courses(args).await,
        Command::Status(args) => run_status(args).await,
        Command::ResetState(args) => run_reset_state(args).await,
    }
}
