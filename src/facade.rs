//! Cache Facade Module
//!
//! Memoizes processor results under derived keys, coordinating writers
//! through the advisory lock and keeping each name's key registry current.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, KeyRegistry, Store};
use crate::config::{CacheOptions, ConfigMap, FacadeSettings};
use crate::error::{CacheError, Result};
use crate::expiry;
use crate::key::{CacheKey, KeyStrategy};
use crate::lock::AdvisoryLock;
use crate::logger::{access_line, CacheLogger, Classification};
use crate::processor::Processor;

// == Cache Facade ==
/// Entry point for every caller.
///
/// All state that affects behaviour (enabled, force-expire, default options,
/// lock path, logger) lives on the instance, so independent facades never
/// interfere with each other except through a shared store or lock file.
pub struct CacheFacade {
    store: Arc<dyn Store>,
    config_map: ConfigMap,
    default_options: CacheOptions,
    enabled: bool,
    force_expire: bool,
    lock: AdvisoryLock,
    logger: Option<Arc<dyn CacheLogger>>,
    stats: Mutex<CacheStats>,
}

impl CacheFacade {
    // == Constructors ==
    /// Creates an enabled facade with default options and settings.
    pub fn new(store: Arc<dyn Store>, config_map: ConfigMap) -> Self {
        Self::with_settings(store, config_map, FacadeSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn Store>,
        config_map: ConfigMap,
        settings: FacadeSettings,
    ) -> Self {
        Self {
            store,
            config_map,
            default_options: CacheOptions::default(),
            enabled: settings.enabled,
            force_expire: settings.force_expire,
            lock: AdvisoryLock::new(settings.lock_path),
            logger: None,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Attach a logger (builder pattern).
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn CacheLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the default options (builder pattern).
    #[must_use]
    pub fn with_default_options(mut self, options: CacheOptions) -> Self {
        self.default_options = options;
        self
    }

    // == Process ==
    /// Returns the cached value for `name`, computing and storing it on a miss.
    ///
    /// When disabled, `processor` runs directly and nothing else happens. In
    /// force-expire mode the stored key is invalidated and the value is
    /// recomputed but not written back.
    pub fn process(
        &self,
        name: &str,
        processor: &dyn Processor,
        strategy: &dyn KeyStrategy,
    ) -> Result<Value> {
        if !self.enabled {
            return Ok(processor.process(name));
        }

        let (options, key) = self.resolve(name, strategy)?;
        let ttl = expiry::ttl_seconds(&options.expires, Utc::now())?;

        if self.force_expire {
            self.lock.with_blocking_lock(|| {
                self.store.delete(key.as_str())?;
                self.remove_stored_key(name, key.as_str())
            });
            let value = processor.process(name);
            self.stats.lock().record_expire();
            self.log(Classification::Expire, name, &key);
            return Ok(value);
        }

        if let Some(value) = self.lookup(&key) {
            self.stats.lock().record_hit();
            self.log(Classification::Hit, name, &key);
            return Ok(value);
        }

        let value = processor.process(name);
        self.populate(name, &key, value.clone(), ttl, strategy);
        self.stats.lock().record_miss();
        self.log(Classification::Miss, name, &key);
        Ok(value)
    }

    // == Get ==
    /// Reads the stored value for `name` without computing anything.
    ///
    /// Always `None` when disabled.
    pub fn get(&self, name: &str, strategy: &dyn KeyStrategy) -> Result<Option<Value>> {
        if !self.enabled {
            return Ok(None);
        }

        let (_, key) = self.resolve(name, strategy)?;

        let value = self.lookup(&key);
        if value.is_some() {
            self.stats.lock().record_hit();
            self.log(Classification::Hit, name, &key);
        } else {
            self.stats.lock().record_miss();
            self.log(Classification::Miss, name, &key);
        }
        Ok(value)
    }

    // == Set ==
    /// Stores `value` for `name` the way a `process` miss would.
    ///
    /// Skipped silently when disabled or when another holder has the lock.
    pub fn set(&self, name: &str, value: Value, strategy: &dyn KeyStrategy) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let (options, key) = self.resolve(name, strategy)?;
        let ttl = expiry::ttl_seconds(&options.expires, Utc::now())?;

        self.populate(name, &key, value, ttl, strategy);
        Ok(())
    }

    // == Flush By Name ==
    /// Deletes every key registered under `name` and empties its registry.
    ///
    /// Waits for the lock. Returns false if the flush could not complete.
    pub fn flush_by_name(&self, name: &str) -> bool {
        let flushed = self.lock.with_blocking_lock(|| {
            let mut registry = KeyRegistry::load(self.store.as_ref(), name)?;
            let keys = registry.keys();
            for key in &keys {
                self.store.delete(key)?;
            }
            registry.clear();
            registry.persist(self.store.as_ref(), name)?;
            Ok(keys.len())
        });

        match flushed {
            Some(count) => {
                debug!(name, count, "facade.flush_by_name");
                true
            }
            None => false,
        }
    }

    // == Flush All ==
    /// Clears the whole store. Waits for the lock.
    pub fn flush_all(&self) -> bool {
        let flushed = self.lock.with_blocking_lock(|| self.store.flush_all()).is_some();
        if flushed {
            debug!("facade.flush_all");
        }
        flushed
    }

    // == Combined Config ==
    /// Merges the entry for `name` onto the default options.
    pub fn combined_config(&self, name: &str) -> Result<CacheOptions> {
        let named = self.config_map.lookup(name)?;
        Ok(self.default_options.merge(&named))
    }

    // == Key Registry ==
    /// Registers `key` under `name`, annotated with the strategy's key
    /// information when it provides any. Re-adding a key is a no-op.
    ///
    /// Read-modify-write; callers serialize through the lock.
    pub fn add_stored_key(&self, name: &str, key: &str, strategy: &dyn KeyStrategy) -> Result<()> {
        let mut registry = KeyRegistry::load(self.store.as_ref(), name)?;
        let information = strategy.key_information().map(|info| info.information());
        if registry.insert(key, information) {
            registry.persist(self.store.as_ref(), name)?;
        }
        Ok(())
    }

    /// Unregisters `key` from `name`. No-op if absent.
    pub fn remove_stored_key(&self, name: &str, key: &str) -> Result<()> {
        let mut registry = KeyRegistry::load(self.store.as_ref(), name)?;
        if registry.remove(key) {
            registry.persist(self.store.as_ref(), name)?;
        }
        Ok(())
    }

    /// Snapshot of the registry kept under `name`.
    pub fn registry(&self, name: &str) -> Result<KeyRegistry> {
        KeyRegistry::load(self.store.as_ref(), name)
    }

    /// Keys currently registered under `name`, sorted.
    pub fn stored_keys(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.registry(name)?.keys())
    }

    // == Settings ==
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_force_expire(&self) -> bool {
        self.force_expire
    }

    pub fn set_force_expire(&mut self, force_expire: bool) {
        self.force_expire = force_expire;
    }

    pub fn default_options(&self) -> &CacheOptions {
        &self.default_options
    }

    pub fn set_default_options(&mut self, options: CacheOptions) {
        self.default_options = options;
    }

    pub fn config_map(&self) -> &ConfigMap {
        &self.config_map
    }

    pub fn set_config_map(&mut self, config_map: ConfigMap) {
        self.config_map = config_map;
    }

    pub fn logger(&self) -> Option<&Arc<dyn CacheLogger>> {
        self.logger.as_ref()
    }

    pub fn set_logger(&mut self, logger: Option<Arc<dyn CacheLogger>>) {
        self.logger = logger;
    }

    pub fn lock_path(&self) -> &std::path::Path {
        self.lock.path()
    }

    pub fn set_lock_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.lock = AdvisoryLock::new(path);
    }

    /// Snapshot of the classification counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    // == Internals ==
    /// Resolves options and derives the key. Nothing touches the store here.
    fn resolve(&self, name: &str, strategy: &dyn KeyStrategy) -> Result<(CacheOptions, CacheKey)> {
        if name.is_empty() {
            return Err(CacheError::InvalidArgument("name must not be empty".to_string()));
        }
        let options = self.combined_config(name)?;
        let key = CacheKey::derive(name, &options, strategy)?;
        if key.as_str() == name {
            return Err(CacheError::InvalidArgument(format!(
                "cache key {key} collides with the registry entry of its name"
            )));
        }
        Ok((options, key))
    }

    /// Store read for the hit path. Store failures read as a miss.
    fn lookup(&self, key: &CacheKey) -> Option<Value> {
        match self.store.contains(key.as_str()) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "facade.store_contains_failed");
                return None;
            }
        }
        match self.store.fetch(key.as_str()) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "facade.store_fetch_failed");
                None
            }
        }
    }

    /// Best-effort write of `value` plus registry update, skipped if the
    /// lock is held elsewhere.
    fn populate(&self, name: &str, key: &CacheKey, value: Value, ttl: i64, strategy: &dyn KeyStrategy) {
        let written = self.lock.with_non_blocking_lock(|| {
            self.store.save(key.as_str(), value, ttl)?;
            self.add_stored_key(name, key.as_str(), strategy)
        });
        if written.is_none() {
            debug!(name, key = %key, "facade.population_skipped");
            self.stats.lock().record_skipped_write();
        }
    }

    fn log(&self, classification: Classification, name: &str, key: &CacheKey) {
        debug!(name, key = %key, classification = classification.as_str(), "facade.call");
        if let Some(logger) = &self.logger {
            logger.info(&access_line(classification, name, key.as_str()));
        }
    }
}
