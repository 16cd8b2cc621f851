//! fragcache - A fragment caching facade
//!
//! Memoizes expensive renders under derived keys, with per-name key
//! registries for bulk invalidation and advisory file locking so that
//! concurrent processes never corrupt shared state.

pub mod cache;
pub mod config;
pub mod error;
pub mod expiry;
pub mod facade;
pub mod key;
pub mod lock;
pub mod logger;
pub mod processor;

pub use cache::{CacheStats, FileStore, KeyRegistry, MemoryStore, Store};
pub use config::{CacheOptions, ConfigMap, Expires, FacadeSettings, NamedOptions};
pub use error::{CacheError, Result};
pub use facade::CacheFacade;
pub use key::{CacheKey, ContextKeyStrategy, FixedKeyStrategy, KeyInformation, KeyStrategy};
pub use lock::AdvisoryLock;
pub use logger::{CacheLogger, Classification, TracingLogger};
pub use processor::Processor;
