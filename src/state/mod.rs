//! Persistent sync state.
//!
//! The only thing that survives between runs is the sync log: a plain text
//! file mapping Canvas file ids to the `modified_at` value that was last
//! downloaded. Course and folder trees are rebuilt from the API every run.

pub mod error;
pub mod sync_log;

pub use error::SyncLogError;
pub use sync_log::SyncLog;
