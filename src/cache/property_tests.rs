//! Property-Based Tests for the caching facade
//!
//! Uses proptest to check key derivation, registry and memoization
//! properties across generated names, options and values.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{KeyRegistry, MemoryStore, Store};
use crate::config::{CacheOptions, ConfigMap, Expires, FacadeSettings, NamedOptions};
use crate::facade::CacheFacade;
use crate::key::{CacheKey, ContextKeyStrategy, FixedKeyStrategy};

// == Strategies ==
/// Generates valid names
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,31}".prop_map(|s| s)
}

fn context_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_map(|s| s)
}

/// Generates rendered fragments
fn fragment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9<>/ ]{0,128}".prop_map(|s| s)
}

fn named_options_strategy() -> impl Strategy<Value = NamedOptions> {
    (
        proptest::option::of(context_strategy()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(prop_oneof![
            Just(Expires::Never),
            (1u32..48).prop_map(|h| Expires::At(format!("+{h} hours"))),
        ]),
    )
        .prop_map(|(context, member, expires)| NamedOptions {
            context,
            member,
            expires,
            ..NamedOptions::default()
        })
}

fn facade_for(name: &str, store: Arc<MemoryStore>, dir: &tempfile::TempDir) -> CacheFacade {
    let mut config_map = ConfigMap::new();
    config_map.insert(name, NamedOptions::default()).unwrap();
    let settings = FacadeSettings {
        lock_path: dir.path().join("prop.lock"),
        ..FacadeSettings::default()
    };
    CacheFacade::with_settings(store, config_map, settings)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Key derivation is a pure function of name and merged options
    #[test]
    fn prop_key_derivation_is_deterministic(
        name in name_strategy(),
        named in named_options_strategy(),
        identity in "[a-z]{1,8}",
    ) {
        let options = CacheOptions::default().merge(&named);
        let strategy = ContextKeyStrategy::for_identity(identity);

        let first = CacheKey::derive(&name, &options, &strategy).unwrap();
        let second = CacheKey::derive(&name, &options.clone(), &strategy).unwrap();
        prop_assert_eq!(first, second);
    }

    // Changing the context changes the key
    #[test]
    fn prop_context_change_changes_key(
        name in name_strategy(),
        a in context_strategy(),
        b in context_strategy(),
    ) {
        prop_assume!(a != b);
        let strategy = ContextKeyStrategy::new();
        let with_a = CacheOptions { context: a, ..CacheOptions::default() };
        let with_b = CacheOptions { context: b, ..CacheOptions::default() };

        prop_assert_ne!(
            CacheKey::derive(&name, &with_a, &strategy).unwrap(),
            CacheKey::derive(&name, &with_b, &strategy).unwrap()
        );
    }

    // Per-name fields win, omitted fields inherit the defaults
    #[test]
    fn prop_merge_field_by_field(named in named_options_strategy()) {
        let defaults = CacheOptions::default();
        let merged = defaults.merge(&named);

        prop_assert_eq!(merged.context, named.context.unwrap_or(defaults.context));
        prop_assert_eq!(merged.member, named.member.unwrap_or(defaults.member));
        prop_assert_eq!(merged.expires, named.expires.unwrap_or(defaults.expires));
    }

    // Registering keys keeps exactly one entry per distinct key
    #[test]
    fn prop_registry_insert_idempotent(keys in prop::collection::vec("[a-z]{1,4}", 1..40)) {
        let store = MemoryStore::new();
        for key in &keys {
            let mut registry = KeyRegistry::load(&store, "family").unwrap();
            registry.insert(key, None);
            registry.persist(&store, "family").unwrap();
        }

        let expected: HashSet<&String> = keys.iter().collect();
        let registry = KeyRegistry::load(&store, "family").unwrap();
        prop_assert_eq!(registry.len(), expected.len());
        for key in expected {
            prop_assert!(registry.information(key).is_some());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // First process is a miss returning the processor output, the second is
    // a hit returning the same value without calling the processor
    #[test]
    fn prop_miss_then_hit(name in name_strategy(), fragment in fragment_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade_for(&name, Arc::new(MemoryStore::new()), &dir);
        let calls = AtomicUsize::new(0);
        let render = |_: &str| -> Value {
            calls.fetch_add(1, Ordering::SeqCst);
            json!(fragment.clone())
        };
        let strategy = ContextKeyStrategy::new();

        let first = facade.process(&name, &render, &strategy).unwrap();
        let second = facade.process(&name, &render, &strategy).unwrap();

        prop_assert_eq!(&first, &json!(fragment));
        prop_assert_eq!(first, second);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(facade.stats().hits, 1);
        prop_assert_eq!(facade.stats().misses, 1);
    }

    // Flushing a name removes every key stored for it
    #[test]
    fn prop_flush_by_name_removes_every_key(
        name in name_strategy(),
        variants in prop::collection::hash_set("[a-z]{1,6}", 1..8),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let facade = facade_for(&name, store.clone(), &dir);

        for variant in &variants {
            let strategy = FixedKeyStrategy::new([variant.as_str()]);
            facade.set(&name, json!(variant), &strategy).unwrap();
        }
        prop_assert_eq!(facade.stored_keys(&name).unwrap().len(), variants.len());

        prop_assert!(facade.flush_by_name(&name));

        prop_assert!(facade.stored_keys(&name).unwrap().is_empty());
        for variant in &variants {
            let key = format!("{name}.{variant}");
            prop_assert!(!store.contains(&key).unwrap());
        }
    }
}
