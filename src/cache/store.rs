//! Store Module
//!
//! The key-value backend contract consumed by the facade, and an in-process
//! implementation of it.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::StoreEntry;
use crate::error::Result;

// == Store Trait ==
/// Opaque key-value backend with TTL support.
///
/// Individual calls must be safe under concurrent use; no atomicity is
/// assumed across calls. A TTL of `0` means no expiry and a negative TTL
/// stores an entry that already reads as expired.
pub trait Store: Send + Sync {
    fn contains(&self, key: &str) -> Result<bool>;

    fn fetch(&self, key: &str) -> Result<Option<Value>>;

    fn save(&self, key: &str, value: Value, ttl_seconds: i64) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn flush_all(&self) -> Result<()>;
}

// == Memory Store ==
/// In-process store backed by a `HashMap`.
///
/// Expired entries read as absent and are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Number of entries held, including ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the live entry for `key`, dropping it if it has expired.
    fn live_entry(&self, key: &str) -> Option<StoreEntry> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(StoreEntry::is_expired) {
            entries.remove(key);
        }
        None
    }
}

impl Store for MemoryStore {
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).is_some())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.live_entry(key).map(|entry| entry.value))
    }

    fn save(&self, key: &str, value: Value, ttl_seconds: i64) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), StoreEntry::new(value, ttl_seconds));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn flush_all(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_save_and_fetch() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), 0).unwrap();

        assert!(store.contains("key1").unwrap());
        assert_eq!(store.fetch("key1").unwrap(), Some(json!("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_fetch_nonexistent() {
        let store = MemoryStore::new();

        assert!(!store.contains("nonexistent").unwrap());
        assert_eq!(store.fetch("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_store_delete() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), 0).unwrap();
        store.delete("key1").unwrap();

        assert!(store.is_empty());
        assert_eq!(store.fetch("key1").unwrap(), None);
    }

    #[test]
    fn test_store_delete_nonexistent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("nonexistent").is_ok());
    }

    #[test]
    fn test_store_overwrite() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), 0).unwrap();
        store.save("key1", json!("value2"), 0).unwrap();

        assert_eq!(store.fetch("key1").unwrap(), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), 1).unwrap();
        assert!(store.contains("key1").unwrap());

        sleep(Duration::from_millis(1100));

        assert!(!store.contains("key1").unwrap());
        assert_eq!(store.fetch("key1").unwrap(), None);
        assert!(store.is_empty(), "expired entry should be dropped on access");
    }

    #[test]
    fn test_store_negative_ttl_reads_absent() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), -30).unwrap();
        assert!(!store.contains("key1").unwrap());
    }

    #[test]
    fn test_store_flush_all() {
        let store = MemoryStore::new();

        store.save("key1", json!(1), 0).unwrap();
        store.save("key2", json!(2), 60).unwrap();
        store.flush_all().unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_store_purge_expired() {
        let store = MemoryStore::new();

        store.save("key1", json!("value1"), -1).unwrap();
        store.save("key2", json!("value2"), 10).unwrap();
        store.save("key3", json!("value3"), 0).unwrap();

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.contains("key2").unwrap());
    }
}
