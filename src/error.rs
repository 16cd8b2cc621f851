//! Error types for the caching facade
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No configuration entry exists for the requested name
    #[error("Configuration not found for name: {0}")]
    ConfigNotFound(String),

    /// A caller-supplied argument was rejected before any store access
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem failure (lock file or file store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific store failure
    #[error("Store error: {0}")]
    Store(String),
}

// == Result Type Alias ==
/// Convenience Result type for the caching facade.
pub type Result<T> = std::result::Result<T, CacheError>;
