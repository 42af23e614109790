use super::*;
use crate::test_support::{FIXTURE_SCHEMA, schema};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

///
/// CountingProvider
///

struct CountingProvider {
    inner: SchemaDef,
    calls: Arc<AtomicUsize>,
}

impl MetadataProvider for CountingProvider {
    fn entity(&self, entity: &str) -> Option<EntityModel> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.entity(entity)
    }
}

fn counting() -> (ModelCache, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ModelCache::new(CountingProvider {
        inner: schema(),
        calls: calls.clone(),
    });

    (cache, calls)
}

// ----------------------------------------------------------------------
// Schema
// ----------------------------------------------------------------------

#[test]
fn fixture_schema_describes_entities() {
    let order = schema().entity("Order").unwrap();

    assert_eq!(order.primary_key, "id");
    assert_eq!(order.discriminator, "Order");
    assert_eq!(order.property("total"), Some(&ValueType::Float));
    assert_eq!(
        order.property("status"),
        Some(&ValueType::Enum(vec![
            "open".to_string(),
            "shipped".to_string(),
            "closed".to_string(),
        ]))
    );
    assert!(order.relation("items").unwrap().is_collection());
    assert!(!order.relation("customer").unwrap().is_collection());
    assert_eq!(order.alias("sku"), Some("items.sku"));
    assert_eq!(order.relation_names(), ["customer", "items"]);
    assert!(order.segment_names().contains(&"buyer".to_string()));

    let animal = schema().entity("Animal").unwrap();
    assert!(animal.is_abstract);
    assert_eq!(animal.subclasses, ["Dog", "Cat"]);

    assert!(schema().entity("Nope").is_none());
}

#[test]
fn schema_validation_rejects_dangling_references() {
    let cases = [
        (
            "[entities.A]\nproperties = { name = \"text\" }\n",
            "primary key",
        ),
        (
            "[entities.A]\nproperties = { id = \"int\" }\nrelations = { b = { target = \"B\" } }\n",
            "unknown entity 'B'",
        ),
        (
            "[entities.A]\nproperties = { id = \"int\" }\nsubclasses = [\"B\"]\n",
            "unknown subclass 'B'",
        ),
        (
            "[entities.A]\nproperties = { id = \"int\", b = \"text\" }\nrelations = { b = { target = \"A\" } }\n",
            "both a property and a relation",
        ),
        (
            "[entities.A]\nproperties = { id = \"int\" }\naliases = { x = \" \" }\n",
            "non-empty path",
        ),
        (
            "[entities.A]\ndiscriminator = \"x\"\nproperties = { id = \"int\" }\n\
             [entities.B]\ndiscriminator = \"x\"\nproperties = { id = \"int\" }\n",
            "discriminator 'x'",
        ),
    ];

    for (text, expected) in cases {
        let err = SchemaDef::from_toml_str(text).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "{err} should mention {expected}"
        );
    }
}

#[test]
fn schema_rejects_unknown_keys_and_types() {
    assert!(matches!(
        SchemaDef::from_toml_str("[entities.A]\nproperties = { id = \"decimal\" }\n"),
        Err(SchemaError::Parse(_))
    ));
    assert!(matches!(
        SchemaDef::from_toml_str("[entities.A]\ncolour = \"red\"\n"),
        Err(SchemaError::Parse(_))
    ));
}

#[test]
fn schema_load_reports_missing_file() {
    let err = SchemaDef::load("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}

#[test]
fn fixture_text_is_valid() {
    assert!(SchemaDef::from_toml_str(FIXTURE_SCHEMA).is_ok());
}

// ----------------------------------------------------------------------
// Value types
// ----------------------------------------------------------------------

#[test]
fn value_type_capabilities() {
    assert!(ValueType::Timestamp.supports_ordering());
    assert!(!ValueType::Bool.supports_ordering());
    assert!(!ValueType::Enum(Vec::new()).supports_ordering());
    assert!(ValueType::Text.supports_text_match());
    assert!(!ValueType::Ulid.supports_text_match());
    assert!(ValueType::Int.is_comparable_with(&ValueType::Float));
    assert!(!ValueType::Int.is_comparable_with(&ValueType::Text));
    assert!(ValueType::Enum(vec!["a".to_string()]).is_comparable_with(&ValueType::Enum(Vec::new())));
}

// ----------------------------------------------------------------------
// Cache
// ----------------------------------------------------------------------

#[test]
fn cache_consults_provider_once_per_entity() {
    let (cache, calls) = counting();

    let first = cache.get("Order").unwrap();
    let second = cache.get("Order").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cache.stats(),
        CacheStats {
            hits: 1,
            misses: 1,
            size: 1,
        }
    );
}

#[test]
fn cache_does_not_memoize_unknown_entities() {
    let (cache, calls) = counting();

    assert!(cache.get("Nope").is_none());
    assert!(cache.get("Nope").is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().size, 0);
}

#[test]
fn cache_clear_resets_entries_and_counters() {
    let (cache, calls) = counting();
    let _ = cache.get("Order");
    cache.clear();

    assert_eq!(
        cache.stats(),
        CacheStats {
            hits: 0,
            misses: 0,
            size: 0,
        }
    );
    let _ = cache.get("Order");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_first_use_shares_one_model() {
    let (cache, _) = counting();
    let cache = Arc::new(cache);

    let models: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.get("Customer").unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(cache.stats().size, 1);
}

#[test]
fn global_cache_installs_once() {
    let first = ModelCache::install_global(schema());
    let second = ModelCache::install_global(SchemaDef::default());

    assert!(Arc::ptr_eq(&first, &second));
    assert!(ModelCache::global().is_some_and(|global| Arc::ptr_eq(&global, &first)));
    assert!(first.get("Order").is_some());
}
