//! Logger Module
//!
//! Optional sink for the one-line-per-call classification log.

use std::fmt;

use tracing::info;

/// How a facade call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Hit,
    Miss,
    Expire,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Hit => "HIT",
            Classification::Miss => "MISS",
            Classification::Expire => "EXPIRE",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one message per `process`/`get` call.
pub trait CacheLogger: Send + Sync {
    fn info(&self, message: &str);
}

/// Forwards messages to `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "fragcache::access", "{}", message);
    }
}

/// Formats the access line for a classified call.
pub fn access_line(classification: Classification, name: &str, key: &str) -> String {
    format!("{classification} {name} {key}")
}
