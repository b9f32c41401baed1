//! JSON-file backed cache
//!
//! Keeps the whole key set in memory and rewrites the file on every new
//! entry. Volume is one key per user per month, so this stays small.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::LocalCache;
use crate::record::CompositeKey;

/// Cache persisted to a JSON array of keys
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<BTreeSet<String>>,
}

impl FileCache {
    /// Open the cache at `path`. A missing file starts empty; an unreadable
    /// one is logged and replaced on the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries: BTreeSet<String> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt cache file, starting empty");
                BTreeSet::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e),
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened local cache");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeSet<String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl LocalCache for FileCache {
    fn has(&self, key: &CompositeKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key.cache_key())
    }

    fn set(&self, key: &CompositeKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.insert(key.cache_key()) {
            return;
        }
        if let Err(e) = self.persist(&entries) {
            warn!(path = %self.path.display(), key = %key, error = %e, "Failed to persist cache entry");
        }
    }
}
