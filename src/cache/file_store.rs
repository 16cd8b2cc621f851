//! File Store Module
//!
//! A store shared between processes on one host: one JSON document per key
//! inside a directory.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{Store, StoreEntry};
use crate::error::Result;

const ENTRY_EXTENSION: &str = "json";

// == File Store ==
/// Directory-backed store.
///
/// Each key lives in `<dir>/<hex(key)>.json`. Writes go through a temporary
/// file and a rename, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Removes every expired entry file. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = current_timestamp_ms();
        let mut removed = 0;
        for path in self.entry_paths()? {
            if let Some(entry) = read_entry(&path)? {
                if entry.is_expired_at(now) && remove_if_present(&path)? {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", encode_key(key)))
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Reads the entry for `key`, reporting an expired one as absent.
    ///
    /// Expired files stay on disk until `purge_expired` or the next `save`;
    /// another process may already have renamed a fresh document into place.
    fn live_entry(&self, key: &str) -> Result<Option<StoreEntry>> {
        match read_entry(&self.path_for(key))? {
            Some(entry) if entry.is_expired() => {
                debug!(key, "file_store.expired_on_read");
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

impl Store for FileStore {
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key)?.is_some())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.live_entry(key)?.map(|entry| entry.value))
    }

    fn save(&self, key: &str, value: Value, ttl_seconds: i64) -> Result<()> {
        let path = self.path_for(key);
        let document = serde_json::to_vec(&StoreEntry::new(value, ttl_seconds))?;

        let staging = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            encode_key(key),
            std::process::id(),
            current_timestamp_ms()
        ));
        fs::write(&staging, document)?;
        if let Err(err) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        remove_if_present(&self.path_for(key))?;
        Ok(())
    }

    fn flush_all(&self) -> Result<()> {
        for path in self.entry_paths()? {
            remove_if_present(&path)?;
        }
        Ok(())
    }
}

fn read_entry(path: &Path) -> Result<Option<StoreEntry>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Returns whether a file was actually removed.
fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Lowercase hex of the key bytes; keeps file names portable.
fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{b:02x}")).collect()
}
