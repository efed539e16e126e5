//! Sync engine: classifies every file in the loaded tree against the sync
//! log, downloads what is new or changed, and persists the log once at the
//! end of the run.
//!
//! Processing is strictly sequential (course, then folder, then file, in the
//! order Canvas returned them). A file is recorded in the log only after its
//! bytes have been renamed into place, so a failed or interrupted download is
//! retried on the next run.

pub mod error;
pub mod file;
pub mod paths;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::canvas::{Container, HierarchyLoader, Item, Remote, RemoteApi, SubContainer};
use crate::events::{EventSink, SyncEvent};
use crate::state::SyncLog;
use crate::types::LogParsePolicy;

use self::error::SyncError;

/// Subset of application config consumed by a sync run.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root: PathBuf,
    pub log_path: PathBuf,
    /// Course codes to sync; empty means all.
    pub courses: HashSet<String>,
    pub log_parse_policy: LogParsePolicy,
}

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub download_failures: usize,
    pub fetch_errors: usize,
    pub interrupted: bool,
}

impl SyncReport {
    pub fn error_count(&self) -> usize {
        self.download_failures + self.fetch_errors
    }
}

/// Walks a loaded tree and brings `root` up to date.
pub struct SyncEngine<'a> {
    remote: &'a Remote<'a>,
    sink: &'a dyn EventSink,
    root: &'a Path,
    log_path: &'a Path,
    shutdown: CancellationToken,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        remote: &'a Remote<'a>,
        sink: &'a dyn EventSink,
        root: &'a Path,
        log_path: &'a Path,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            remote,
            sink,
            root,
            log_path,
            shutdown,
        }
    }

    /// Process every file in `tree`, mutating `log` as files are confirmed on
    /// disk, then save `log` exactly once.
    ///
    /// Per-file failures are reported as events and counted; only failing to
    /// create `root` or to save the log ends the run with an error. In the
    /// latter case the log on disk is the one from the previous run.
    pub async fn run(
        &self,
        tree: &[Container],
        log: &mut SyncLog,
    ) -> Result<SyncReport, SyncError> {
        tokio::fs::create_dir_all(self.root)
            .await
            .map_err(|source| SyncError::Root {
                path: self.root.to_path_buf(),
                source,
            })?;

        let mut report = SyncReport::default();
        'courses: for course in tree {
            let course_dir = course.directory_name();
            for folder in &course.children {
                if self.shutdown.is_cancelled() {
                    break 'courses;
                }
                self.sync_folder(&course_dir, folder, log, &mut report).await?;
            }
        }

        if self.shutdown.is_cancelled() {
            report.interrupted = true;
            tracing::info!("Shutdown requested, saving sync log before exit");
        }

        log.save(self.log_path).await?;
        report.fetch_errors = self.remote.fetch_errors();
        Ok(report)
    }

    async fn sync_folder(
        &self,
        course_dir: &str,
        folder: &SubContainer,
        log: &mut SyncLog,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let dir = paths::local_directory(self.root, course_dir, &folder.relative_path());
        if let Err(e) = file::ensure_dir(&dir).await {
            tracing::warn!("{}", e);
            for item in &folder.items {
                self.download_failed(item, report);
            }
            return Ok(());
        }

        for item in &folder.items {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.sync_item(&dir, item, log, report).await?;
        }
        Ok(())
    }

    async fn sync_item(
        &self,
        dir: &Path,
        item: &Item,
        log: &mut SyncLog,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if log.is_up_to_date(item) {
            report.skipped += 1;
            self.sink.emit(SyncEvent::ItemSkipped {
                id: item.id,
                name: item.display_name.clone(),
            });
            return Ok(());
        }
        let known = log.is_present(item);

        let Some(bytes) = self.remote.download_bytes(item).await else {
            report.download_failures += 1;
            return Ok(());
        };

        let dest = dir.join(paths::item_file_name(&item.display_name, item.id));
        if let Err(e) = file::write_atomic(&dest, &bytes).await {
            tracing::warn!("{}", e);
            self.download_failed(item, report);
            return Ok(());
        }
        tracing::debug!(
            size_bytes = bytes.len(),
            path = %dest.display(),
            "wrote file",
        );

        let name = item.display_name.clone();
        if known {
            log.update_version(item.id, item.version_token.as_str());
            report.updated += 1;
            self.sink.emit(SyncEvent::ItemUpdated { id: item.id, name });
        } else {
            log.insert(item.id, item.version_token.as_str())?;
            report.added += 1;
            self.sink.emit(SyncEvent::ItemAdded { id: item.id, name });
        }
        Ok(())
    }

    fn download_failed(&self, item: &Item, report: &mut SyncReport) {
        report.download_failures += 1;
        self.sink.emit(SyncEvent::DownloadFailed {
            id: item.id,
            name: item.display_name.clone(),
        });
    }
}

/// One complete run: load the log, load the tree, sync, save, report.
///
/// `RunComplete` is emitted whenever the log was saved, including after a
/// shutdown request.
pub async fn sync(
    api: &dyn RemoteApi,
    settings: &SyncSettings,
    sink: &dyn EventSink,
    shutdown: CancellationToken,
) -> Result<SyncReport, SyncError> {
    let started = Instant::now();
    let mut log = SyncLog::load(&settings.log_path, settings.log_parse_policy).await;
    tracing::debug!(
        "Sync log {} has {} entries",
        settings.log_path.display(),
        log.len()
    );

    let remote = Remote::new(api, sink);
    let tree = HierarchyLoader::new(&remote, sink)
        .load(&settings.courses, &shutdown)
        .await;

    let engine = SyncEngine::new(
        &remote,
        sink,
        &settings.root,
        &settings.log_path,
        shutdown,
    );
    let report = engine.run(&tree, &mut log).await?;

    sink.emit(SyncEvent::RunComplete {
        added_count: report.added,
        updated_count: report.updated,
        skipped_count: report.skipped,
        error_count: report.error_count(),
    });
    tracing::info!("  elapsed: {}", format_duration(started.elapsed()));
    Ok(report)
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
