//! JSON-backed record store with URL de-duplication.
//!
//! The store is one pretty-printed JSON array on disk. It is never edited in
//! place: every change loads the whole array, builds the new one in memory
//! and replaces the file through a sibling temp file and a rename, so a
//! reader (or an interrupted run) only ever sees a complete document.
//!
//! # Output Structure
//!
//! ```text
//! output/
//! └── articles.json   # [ { "id": ..., "url": ..., "source": "web", ... }, ... ]
//! ```

use crate::models::Record;
use crate::normalize::canonical_url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write store {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One element of the stored array.
///
/// Elements that do not read as a [`Record`] (written by another tool or an
/// older version) are kept verbatim and survive every rewrite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Record(Record),
    Foreign(Value),
}

impl StoredEntry {
    /// The entry's `url`, empty when it has none.
    pub fn url(&self) -> &str {
        match self {
            StoredEntry::Record(record) => &record.url,
            StoredEntry::Foreign(value) => value.get("url").and_then(Value::as_str).unwrap_or(""),
        }
    }
}

/// Counts reported by [`Store::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Records handed to the merge.
    pub offered: usize,
    /// Records actually appended after de-duplication.
    pub added: usize,
    /// Store size after the merge.
    pub total: usize,
}

impl MergeOutcome {
    pub fn skipped(&self) -> usize {
        self.offered - self.added
    }
}

/// Handle on a store file. Holds no records between calls.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every element of the store. A missing, unreadable or malformed
    /// file, or one that is not a JSON array, is an empty store.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub fn entries(&self) -> Vec<StoredEntry> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Store file does not exist yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read store; treating as empty");
                return Vec::new();
            }
        };

        let items = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("Store is not a JSON array; treating as empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Store is not valid JSON; treating as empty");
                return Vec::new();
            }
        };

        let entries: Vec<StoredEntry> = items.into_iter().map(StoredEntry::from).collect();
        let foreign = entries
            .iter()
            .filter(|e| matches!(e, StoredEntry::Foreign(_)))
            .count();
        if foreign > 0 {
            warn!(foreign, "Store holds elements that are not records; keeping them as-is");
        }
        entries
    }

    /// Load the records of the store, skipping foreign elements.
    pub fn load(&self) -> Vec<Record> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                StoredEntry::Record(record) => Some(record),
                StoredEntry::Foreign(_) => None,
            })
            .collect()
    }

    /// Alias of [`Store::load`] for read-only callers.
    pub fn records(&self) -> Vec<Record> {
        self.load()
    }

    /// Number of stored elements, foreign ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the records whose `url` is empty or not yet stored, then
    /// persist the whole store.
    ///
    /// URLs are compared in canonical form. Relative order of the appended
    /// records is kept. A URL repeated within `incoming` is only appended
    /// once. Foreign elements are written back unchanged.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), offered = incoming.len()))]
    pub fn merge(&self, incoming: Vec<Record>) -> Result<MergeOutcome, StoreError> {
        let mut entries = self.entries();
        let offered = incoming.len();
        let fresh = dedup_against(entries.iter().map(StoredEntry::url), incoming);
        let added = fresh.len();
        entries.extend(fresh.into_iter().map(StoredEntry::Record));

        self.write_entries(&entries)?;
        let outcome = MergeOutcome {
            offered,
            added,
            total: entries.len(),
        };
        info!(
            added = outcome.added,
            skipped = outcome.skipped(),
            total = outcome.total,
            "Merged records into store"
        );
        Ok(outcome)
    }

    /// Replace the store with an empty array.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub fn clear(&self) -> Result<(), StoreError> {
        self.write_all(&[])?;
        info!("Cleared store");
        Ok(())
    }

    /// Write `records` as the complete new store.
    pub fn write_all(&self, records: &[Record]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        self.write_json(&json)
    }

    fn write_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;
        self.write_json(&json)
    }

    fn write_json(&self, json: &str) -> Result<(), StoreError> {
        write_atomic(&self.path, json.as_bytes()).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl From<Value> for StoredEntry {
    fn from(value: Value) -> Self {
        match Record::deserialize(&value) {
            Ok(record) => StoredEntry::Record(record),
            Err(e) => {
                debug!(error = %e, "Keeping foreign store element");
                StoredEntry::Foreign(value)
            }
        }
    }
}

/// Records of `incoming` whose non-empty `url` is neither among
/// `existing_urls` nor earlier in `incoming`, comparing canonical forms.
pub fn dedup_against<'a, I>(existing_urls: I, incoming: Vec<Record>) -> Vec<Record>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = existing_urls
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .map(canonical_url)
        .collect();

    incoming
        .into_iter()
        .filter(|r| r.url.trim().is_empty() || seen.insert(canonical_url(&r.url)))
        .collect()
}

/// Write via `<file>.tmp` in the same directory, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
