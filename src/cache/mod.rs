//! Cache Module
//!
//! Store backends, stored-entry metadata, per-name key registries and
//! statistics.

mod entry;
mod file_store;
mod registry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::StoreEntry;
pub use file_store::FileStore;
pub use registry::KeyRegistry;
pub use stats::CacheStats;
pub use store::{MemoryStore, Store};
