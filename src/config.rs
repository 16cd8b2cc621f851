//! Configuration Module
//!
//! Facade-level settings loaded from environment variables, and the per-name
//! cache options merged onto a default option set.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CacheError, Result};

/// File name of the lock file placed in the temp directory by default.
pub const DEFAULT_LOCK_FILE: &str = "fragcache.lock";

/// Facade settings.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct FacadeSettings {
    /// When false every call bypasses the cache entirely
    pub enabled: bool,
    /// When true every `process` call invalidates and recomputes
    pub force_expire: bool,
    /// Path of the advisory lock file shared by all cooperating processes
    pub lock_path: PathBuf,
}

impl FacadeSettings {
    /// Creates settings by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FRAGCACHE_ENABLED` - Enable caching (default: true)
    /// - `FRAGCACHE_FORCE_EXPIRE` - Force-expire mode (default: false)
    /// - `FRAGCACHE_LOCK_PATH` - Lock file path (default: `<temp>/fragcache.lock`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env::var("FRAGCACHE_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enabled),
            force_expire: env::var("FRAGCACHE_FORCE_EXPIRE")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.force_expire),
            lock_path: env::var("FRAGCACHE_LOCK_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.lock_path),
        }
    }
}

impl Default for FacadeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            force_expire: false,
            lock_path: env::temp_dir().join(DEFAULT_LOCK_FILE),
        }
    }
}

/// Coerces a textual flag into a boolean.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// == Expires ==
/// When a cached value stops being valid.
///
/// Serialized as `false` (never) or an absolute-time expression string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ExpiresRepr", into = "ExpiresRepr")]
pub enum Expires {
    #[default]
    Never,
    At(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExpiresRepr {
    Flag(bool),
    Expression(String),
}

impl TryFrom<ExpiresRepr> for Expires {
    type Error = String;

    fn try_from(repr: ExpiresRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ExpiresRepr::Flag(false) => Ok(Expires::Never),
            ExpiresRepr::Flag(true) => {
                Err("expires must be false or a time expression".to_string())
            }
            ExpiresRepr::Expression(expr) => Ok(Expires::At(expr)),
        }
    }
}

impl From<Expires> for ExpiresRepr {
    fn from(expires: Expires) -> Self {
        match expires {
            Expires::Never => ExpiresRepr::Flag(false),
            Expires::At(expr) => ExpiresRepr::Expression(expr),
        }
    }
}

// == Cache Options ==
/// Fully resolved options for one cached name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Free-form discriminator folded into the key
    pub context: String,
    /// Whether the result varies per authenticated identity
    pub member: bool,
    /// Expiry of populated entries
    pub expires: Expires,
    /// Host-defined options, available to key strategies
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            context: "no".to_string(),
            member: false,
            expires: Expires::Never,
            extra: Map::new(),
        }
    }
}

impl CacheOptions {
    /// Overlays `named` onto these options. Fields set in `named` win, and
    /// host-defined options are merged key by key.
    pub fn merge(&self, named: &NamedOptions) -> CacheOptions {
        let mut extra = self.extra.clone();
        extra.extend(named.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        CacheOptions {
            context: named.context.clone().unwrap_or_else(|| self.context.clone()),
            member: named.member.unwrap_or(self.member),
            expires: named.expires.clone().unwrap_or_else(|| self.expires.clone()),
            extra,
        }
    }

    /// Host-defined option by name.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Per-name options; omitted fields inherit from the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<Expires>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamedOptions {
    /// Set the context discriminator (builder pattern).
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set whether the result varies per identity.
    #[must_use]
    pub fn member(mut self, member: bool) -> Self {
        self.member = Some(member);
        self
    }

    /// Set the expiry.
    #[must_use]
    pub fn expires(mut self, expires: Expires) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set a host-defined option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// == Config Map ==
/// Host-supplied map of per-name option entries.
///
/// Entries are kept as raw JSON and validated lazily on lookup, so a
/// malformed entry only affects the name it belongs to.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: Map<String, Value>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping names to option entries.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(CacheError::InvalidArgument(
                "config map must be a JSON object".to_string(),
            )),
        }
    }

    /// Reads and parses a JSON config map file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Adds or replaces a typed entry.
    pub fn insert(&mut self, name: impl Into<String>, options: NamedOptions) -> Result<()> {
        self.entries
            .insert(name.into(), serde_json::to_value(options)?);
        Ok(())
    }

    /// Adds or replaces a raw entry without validating it.
    pub fn insert_raw(&mut self, name: impl Into<String>, entry: Value) {
        self.entries.insert(name.into(), entry);
    }

    /// Looks up and validates the entry for `name`.
    ///
    /// A missing or non-mapping entry is `ConfigNotFound`; a mapping whose
    /// recognised options have the wrong shape is `InvalidArgument`.
    pub fn lookup(&self, name: &str) -> Result<NamedOptions> {
        match self.entries.get(name) {
            Some(entry @ Value::Object(_)) => {
                serde_json::from_value(entry.clone()).map_err(|err| {
                    CacheError::InvalidArgument(format!("invalid options for {name}: {err}"))
                })
            }
            _ => Err(CacheError::ConfigNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
