//! Key Derivation Module
//!
//! Builds composite cache keys from a logical name and pluggable strategies.

use std::fmt;

use serde_json::{json, Value};

use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

/// Delimiter placed between key parts.
pub const KEY_DELIMITER: &str = ".";

// == Strategy Traits ==
/// Derives the ordered key parts for a name under its resolved options.
///
/// Part order is part of the key's identity.
pub trait KeyStrategy: Send + Sync {
    fn key_parts(&self, name: &str, options: &CacheOptions) -> Vec<String>;

    /// Optional capability: metadata recorded next to each registered key.
    fn key_information(&self) -> Option<&dyn KeyInformation> {
        None
    }
}

/// Describes the keys a strategy produces.
pub trait KeyInformation {
    fn information(&self) -> Value;
}

// == Cache Key ==
/// The final delimited store key for one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Joins `parts` with [`KEY_DELIMITER`].
    pub fn from_parts(parts: &[String]) -> Result<Self> {
        if parts.is_empty() {
            return Err(CacheError::InvalidArgument(
                "key strategy produced no key parts".to_string(),
            ));
        }
        Ok(Self(parts.join(KEY_DELIMITER)))
    }

    /// Derives the key for `name` using `strategy`.
    pub fn derive(name: &str, options: &CacheOptions, strategy: &dyn KeyStrategy) -> Result<Self> {
        Self::from_parts(&strategy.key_parts(name, options))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Context Key Strategy ==
/// Keys on `[name, context, audience]`.
///
/// The audience part is the configured identity when the options mark the
/// name as member-specific, and `public` otherwise.
#[derive(Debug, Clone, Default)]
pub struct ContextKeyStrategy {
    identity: Option<String>,
}

impl ContextKeyStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy for requests made on behalf of `identity`.
    pub fn for_identity(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }

    fn audience(&self, options: &CacheOptions) -> String {
        if options.member {
            self.identity
                .clone()
                .unwrap_or_else(|| "anonymous".to_string())
        } else {
            "public".to_string()
        }
    }
}

impl KeyStrategy for ContextKeyStrategy {
    fn key_parts(&self, name: &str, options: &CacheOptions) -> Vec<String> {
        vec![
            name.to_string(),
            options.context.clone(),
            self.audience(options),
        ]
    }

    fn key_information(&self) -> Option<&dyn KeyInformation> {
        Some(self)
    }
}

impl KeyInformation for ContextKeyStrategy {
    fn information(&self) -> Value {
        json!({
            "strategy": "context",
            "identity": self.identity,
        })
    }
}

// == Fixed Key Strategy ==
/// Keys on the name followed by caller-supplied parts, ignoring options.
#[derive(Debug, Clone, Default)]
pub struct FixedKeyStrategy {
    parts: Vec<String>,
}

impl FixedKeyStrategy {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeyStrategy for FixedKeyStrategy {
    fn key_parts(&self, name: &str, _options: &CacheOptions) -> Vec<String> {
        std::iter::once(name.to_string())
            .chain(self.parts.iter().cloned())
            .collect()
    }
}
