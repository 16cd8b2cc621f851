//! Key Registry Module
//!
//! Per-name record of every cache key populated under that name, persisted
//! in the store under the raw name so the whole family can be invalidated.

use serde_json::{Map, Value};

use crate::cache::Store;
use crate::error::Result;
use crate::expiry::NO_EXPIRY;

// == Key Registry ==
/// Mapping from cache key to metadata (`true` when there is none).
///
/// Always read, modified and written back as a whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRegistry {
    keys: Map<String, Value>,
}

impl KeyRegistry {
    /// Reads the registry stored under `name`.
    ///
    /// A missing or non-object document reads as an empty registry.
    pub fn load(store: &dyn Store, name: &str) -> Result<Self> {
        let keys = match store.fetch(name)? {
            Some(Value::Object(keys)) => keys,
            _ => Map::new(),
        };
        Ok(Self { keys })
    }

    /// Writes the registry back under `name`, without expiry.
    pub fn persist(&self, store: &dyn Store, name: &str) -> Result<()> {
        store.save(name, Value::Object(self.keys.clone()), NO_EXPIRY)
    }

    /// Registers `key`. Returns false, leaving metadata untouched, if it was
    /// already present.
    pub fn insert(&mut self, key: &str, information: Option<Value>) -> bool {
        if self.keys.contains_key(key) {
            return false;
        }
        self.keys
            .insert(key.to_string(), information.unwrap_or(Value::Bool(true)));
        true
    }

    /// Unregisters `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }

    /// Metadata recorded for `key`, `None` when it is not registered.
    pub fn information(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
