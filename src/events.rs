//! Status events produced by the sync core.
//!
//! The core never prints. Anything that wants to show progress (the CLI's
//! log output, a test, a UI) implements [`EventSink`] and receives a stream of
//! [`SyncEvent`]s in processing order.

use std::fmt;
#[cfg(test)]
use std::sync::Mutex;

/// Which list call a [`SyncEvent::FetchError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    Containers,
    SubContainers,
    Items,
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchScope::Containers => f.write_str("courses"),
            FetchScope::SubContainers => f.write_str("folders"),
            FetchScope::Items => f.write_str("files"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ContainerStarted {
        code: String,
        name: String,
    },
    SubContainerDiscovered {
        id: u64,
        path: String,
    },
    ItemAdded {
        id: u64,
        name: String,
    },
    ItemUpdated {
        id: u64,
        name: String,
    },
    ItemSkipped {
        id: u64,
        name: String,
    },
    /// A list call failed. `id` is the parent whose children were requested
    /// (absent for the top-level course list); `status` is absent for
    /// transport or body errors.
    FetchError {
        scope: FetchScope,
        id: Option<u64>,
        status: Option<u16>,
    },
    DownloadFailed {
        id: u64,
        name: String,
    },
    RunComplete {
        added_count: usize,
        updated_count: usize,
        skipped_count: usize,
        error_count: usize,
    },
}

/// Subscriber for [`SyncEvent`]s. Implementations must not block for long;
/// the engine calls `emit` inline between network operations.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Renders events as log lines. This is the CLI's presentation layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: SyncEvent) {
        match event {
            SyncEvent::ContainerStarted { code, name } => {
                tracing::info!("Course: {} ({})", name, code);
            }
            SyncEvent::SubContainerDiscovered { id, path } => {
                tracing::info!("  folder {} {}", id, path);
            }
            SyncEvent::ItemAdded { id, name } => {
                tracing::info!("Added file ID {}: {}", id, name);
            }
            SyncEvent::ItemUpdated { id, name } => {
                tracing::info!("Updated file ID {}: {}", id, name);
            }
            SyncEvent::ItemSkipped { id, name } => {
                tracing::debug!("No updates required for file ID {}: {}", id, name);
            }
            SyncEvent::FetchError { scope, id, status } => {
                let status = status.map_or_else(|| "transport error".to_string(), |s| format!("HTTP {s}"));
                match id {
                    Some(id) => tracing::error!("Could not fetch {} of {}: {}", scope, id, status),
                    None => tracing::error!("Could not fetch {}: {}", scope, status),
                }
            }
            SyncEvent::DownloadFailed { id, name } => {
                tracing::error!("Failed to download file ID {}: {}", id, name);
            }
            SyncEvent::RunComplete {
                added_count,
                updated_count,
                skipped_count,
                error_count,
            } => {
                tracing::info!("── Summary ──");
                tracing::info!(
                    "  {} added, {} updated, {} unchanged, {} errors",
                    added_count,
                    updated_count,
                    skipped_count,
                    error_count
                );
            }
        }
    }
}

/// Buffers every event in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: SyncEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
