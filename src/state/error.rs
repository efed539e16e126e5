//! Error types for the sync log.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::error::WriteError;

#[derive(Error, Debug)]
pub enum SyncLogError {
    /// `insert` was called for an id that already has an entry.
    #[error("file ID {0} is already in the sync log")]
    DuplicateEntry(u64),

    /// A line that is not `<id> <version>`.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("failed to create sync log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
