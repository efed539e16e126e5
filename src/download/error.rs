use std::path::PathBuf;

use thiserror::Error;

use crate::state::SyncLogError;

/// Failure to put downloaded bytes on disk.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {from} into place at {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("destination {0} has no file name")]
    NoFileName(PathBuf),
}

/// Errors that end a sync run. Everything else is reported as an event and
/// the run carries on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync log error: {0}")]
    Log(#[from] SyncLogError),

    #[error("failed to create destination root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_names_path() {
        let e = WriteError::Write {
            path: PathBuf::from("/data/a.pdf"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(e.to_string(), "failed to write /data/a.pdf: disk full");
    }

    #[test]
    fn log_error_converts_into_sync_error() {
        let e: SyncError = SyncLogError::DuplicateEntry(5).into();
        assert_eq!(e.to_string(), "sync log error: file ID 5 is already in the sync log");
    }
}
