//! The `.files` sync log.
//!
//! One record per line, `"<id> <version>\n"`, no header. Loading is
//! fail-soft: a missing or unreadable file is an empty log, so the worst
//! case is re-downloading files that were already present. Saving is a full
//! rewrite through a `.part` file and a rename.

use std::collections::HashMap;
use std::path::Path;

use super::error::SyncLogError;
use crate::canvas::Item;
use crate::download::file;
use crate::types::LogParsePolicy;

/// The last version of a file known to be on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: u64,
    pub version_token: String,
}

/// Insertion-ordered set of [`LogEntry`], at most one per id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncLog {
    entries: Vec<LogEntry>,
    index: HashMap<u64, usize>,
}

impl SyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the log at `path`. Never fails: a missing file, an unreadable
    /// file, or (under [`LogParsePolicy::DiscardAll`]) any bad line yields an
    /// empty log.
    pub async fn load(path: &Path, policy: LogParsePolicy) -> Self {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No sync log at {}, starting empty", path.display());
                return Self::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read sync log {}: {}. Starting empty; files will be re-downloaded.",
                    path.display(),
                    e
                );
                return Self::new();
            }
        };

        let log = Self::parse(&contents, policy);
        tracing::debug!("Loaded {} entries from {}", log.len(), path.display());
        log
    }

    /// Parse log text according to `policy`. Whitespace-only lines are
    /// ignored under both policies. If an id appears twice, the later line
    /// wins.
    pub fn parse(contents: &str, policy: LogParsePolicy) -> Self {
        let mut log = Self::new();
        for (n, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line, n + 1) {
                Ok(entry) => log.update_version(entry.id, entry.version_token),
                Err(e) => match policy {
                    LogParsePolicy::DiscardAll => {
                        tracing::warn!(
                            "Sync log is corrupt ({}); discarding all entries",
                            e
                        );
                        return Self::new();
                    }
                    LogParsePolicy::SkipLine => {
                        tracing::warn!("Skipping bad sync log entry: {}", e);
                    }
                },
            }
        }
        log
    }

    pub fn find(&self, id: u64) -> Option<&LogEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn is_present(&self, item: &Item) -> bool {
        self.find(item.id).is_some()
    }

    /// True iff the log has this item at exactly its current version.
    pub fn is_up_to_date(&self, item: &Item) -> bool {
        self.find(item.id)
            .is_some_and(|entry| entry.version_token == item.version_token)
    }

    /// Add an entry for an id that is not yet in the log.
    pub fn insert(
        &mut self,
        id: u64,
        version_token: impl Into<String>,
    ) -> Result<(), SyncLogError> {
        if self.index.contains_key(&id) {
            return Err(SyncLogError::DuplicateEntry(id));
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(LogEntry {
            id,
            version_token: version_token.into(),
        });
        Ok(())
    }

    /// Set the version for `id` in place, appending a new entry if absent.
    pub fn update_version(&mut self, id: u64, version_token: impl Into<String>) {
        let version_token = version_token.into();
        match self.index.get(&id) {
            Some(&i) => self.entries[i].version_token = version_token,
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(LogEntry { id, version_token });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Serialized form, one `"<id> <version>\n"` line per entry in insertion order.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 32);
        for entry in self.iter() {
            out.push_str(&entry.id.to_string());
            out.push(' ');
            out.push_str(&entry.version_token);
            out.push('\n');
        }
        out
    }

    /// Replace the log at `path` with this log's contents.
    pub async fn save(&self, path: &Path) -> Result<(), SyncLogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SyncLogError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        file::write_atomic(path, self.to_text().as_bytes()).await?;
        tracing::debug!("Saved {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

fn parse_line(line: &str, number: usize) -> Result<LogEntry, SyncLogError> {
    let parse_err = |reason: &str| SyncLogError::Parse {
        line: number,
        reason: reason.to_string(),
    };
    let line = line.trim();
    let (id, version) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| parse_err("expected `<id> <version>`"))?;
    let id: u64 = id.parse().map_err(|_| parse_err("id is not a number"))?;
    let version = version.trim();
    if version.is_empty() {
        return Err(parse_err("empty version"));
    }
    Ok(LogEntry {
        id,
        version_token: version.to_string(),
    })
}
