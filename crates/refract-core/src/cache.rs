//! Process-wide metadata cache.
//!
//! Metadata is derived at most once per type in the common case and then
//! served from a read-locked map. Entries are never evicted; [`MetadataCache::clear`]
//! exists for test isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::error::Result;
use crate::metadata::Metadata;
use crate::reflect::{Reflect, TypeKey, TypeRef};

/// Environment variable overriding [`CacheConfig::initial_capacity`].
pub const CAPACITY_ENV: &str = "REFRACT_CACHE_CAPACITY";
/// Environment variable overriding [`CacheConfig::strategy`].
pub const STRATEGY_ENV: &str = "REFRACT_CACHE_STRATEGY";

// ============================================================================
// Configuration
// ============================================================================

/// What a lookup does on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissStrategy {
    /// Derive without holding any lock, then insert. Concurrent misses for
    /// the same type may derive more than once; the last insert wins.
    #[default]
    DeriveOutsideLock,
    /// Serialize misses per type on an in-flight lock, so concurrent misses
    /// for one type collapse into one derivation. The map lock is not held
    /// while deriving; lookups of other types proceed.
    SingleFlight,
}

impl MissStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "derive-outside-lock" => Some(MissStrategy::DeriveOutsideLock),
            "single-flight" => Some(MissStrategy::SingleFlight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of entries to reserve up front.
    pub initial_capacity: usize,
    pub strategy: MissStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            strategy: MissStrategy::DeriveOutsideLock,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `REFRACT_CACHE_CAPACITY` and
    /// `REFRACT_CACHE_STRATEGY`. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(CAPACITY_ENV) {
            match value.trim().parse::<usize>() {
                Ok(capacity) => config.initial_capacity = capacity,
                Err(e) => warn!("ignoring {}={:?}: {}", CAPACITY_ENV, value, e),
            }
        }

        if let Some(value) = lookup(STRATEGY_ENV) {
            match MissStrategy::parse(&value) {
                Some(strategy) => config.strategy = strategy,
                None => warn!(
                    "ignoring {}={:?}: expected derive-outside-lock or single-flight",
                    STRATEGY_ENV, value
                ),
            }
        }

        config
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful derivations, including duplicates from racing misses.
    pub derivations: u64,
}

/// Type keyed store of derived [`Metadata`].
///
/// A hit takes only the map's read lock; statistics are relaxed atomics.
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeKey, Arc<Metadata>>>,
    inflight: Mutex<HashMap<TypeKey, Arc<Mutex<()>>>>,
    strategy: MissStrategy,
    hits: AtomicU64,
    misses: AtomicU64,
    derivations: AtomicU64,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            inflight: Mutex::new(HashMap::new()),
            strategy: config.strategy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            derivations: AtomicU64::new(0),
        }
    }

    /// The process-wide cache, configured from the environment on first use.
    pub fn global() -> &'static MetadataCache {
        static GLOBAL: OnceLock<MetadataCache> = OnceLock::new();
        GLOBAL.get_or_init(|| MetadataCache::with_config(&CacheConfig::from_env()))
    }

    pub fn strategy(&self) -> MissStrategy {
        self.strategy
    }

    /// Metadata for `ty`, deriving it on a miss.
    ///
    /// A pointer type and its pointee share one entry. Derivation failures
    /// are returned to the caller and not cached.
    pub fn get(&self, ty: &TypeRef) -> Result<Arc<Metadata>> {
        let ty = ty.indirect();
        let key = ty.key();

        if let Some(hit) = self.try_peek(&key) {
            trace!("metadata cache hit for {}", ty.type_name());
            self.record_hit();
            return Ok(hit);
        }

        match self.strategy {
            MissStrategy::DeriveOutsideLock => self.derive_and_insert(&ty, key),
            MissStrategy::SingleFlight => self.derive_single_flight(&ty, key),
        }
    }

    fn derive_single_flight(&self, ty: &TypeRef, key: TypeKey) -> Result<Arc<Metadata>> {
        let slot = Arc::clone(self.inflight.lock().entry(key).or_default());

        let result = {
            let _guard = slot.lock();
            match self.try_peek(&key) {
                Some(hit) => {
                    self.record_hit();
                    Ok(hit)
                }
                None => self.derive_and_insert(ty, key),
            }
        };

        let mut inflight = self.inflight.lock();
        // The map and this call hold the only references: no miss is waiting.
        if Arc::strong_count(&slot) == 2 {
            inflight.remove(&key);
        }
        result
    }

    fn derive_and_insert(&self, ty: &TypeRef, key: TypeKey) -> Result<Arc<Metadata>> {
        self.record_miss();
        let built = Arc::new(Metadata::new(ty)?);
        self.record_derivation();

        debug!("caching metadata for {}", ty.type_name());
        self.entries.write().insert(key, Arc::clone(&built));
        Ok(built)
    }

    pub fn get_of<T: Reflect>(&self) -> Result<Arc<Metadata>> {
        self.get(&T::type_of())
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.entries.read().contains_key(&ty.indirect().key())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry and reset the statistics.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.derivations.store(0, Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            derivations: self.derivations.load(Ordering::Relaxed),
        }
    }

    fn try_peek(&self, key: &TypeKey) -> Option<Arc<Metadata>> {
        self.entries.read().get(key).cloned()
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_derivation(&self) {
        self.derivations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{FieldDecl, TypeDescriptor};
    use refract_types::Kind;
    use std::sync::Barrier;
    use std::thread;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn int_type() -> TypeRef {
        TypeDescriptor::synthetic("int", Kind::I64).into_ref()
    }

    fn record_fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::new("A", int_type(), 0).public().with_tag(r#"json:"a""#),
            FieldDecl::new("B", int_type(), 1).public(),
        ]
    }

    fn record() -> TypeRef {
        TypeDescriptor::synthetic("cache.Record", Kind::Struct)
            .named("Record", "cache")
            .with_fields(record_fields)
            .into_ref()
    }

    fn record_ptr() -> TypeRef {
        TypeDescriptor::synthetic("*cache.Record", Kind::Pointer)
            .with_elem(record)
            .into_ref()
    }

    fn broken_fields() -> Vec<FieldDecl> {
        vec![FieldDecl::new("A", int_type(), 0).with_tag(r#"json:"a"#)]
    }

    fn broken() -> TypeRef {
        TypeDescriptor::synthetic("cache.Broken", Kind::Struct)
            .with_fields(broken_fields)
            .into_ref()
    }

    #[test]
    fn test_pointer_shares_entry() {
        init_logger();
        let cache = MetadataCache::new();

        let direct = cache.get(&record()).unwrap();
        let via_ptr = cache.get(&record_ptr()).unwrap();
        assert!(Arc::ptr_eq(&direct, &via_ptr));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&record_ptr()));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.derivations, 1);
    }

    #[test]
    fn test_native_pointer_shares_entry() {
        let cache = MetadataCache::new();
        let a = cache.get_of::<Option<String>>().unwrap();
        let b = cache.get_of::<String>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind(), Kind::String);
    }

    #[test]
    fn test_non_struct_cached_once() {
        let cache = MetadataCache::new();
        cache.get(&int_type()).unwrap();
        cache.get(&int_type()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().derivations, 1);
    }

    #[test]
    fn test_failures_not_cached() {
        init_logger();
        let cache = MetadataCache::new();
        for _ in 0..2 {
            let err = cache.get(&broken()).unwrap_err();
            assert!(err.is_tag_syntax());
        }
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.stats().derivations, 0);
    }

    #[test]
    fn test_clear() {
        let cache = MetadataCache::new();
        let first = cache.get(&record()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), LookupStats::default());

        let second = cache.get(&record()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.num_field(), second.num_field());
    }

    fn concurrent_first_access(strategy: MissStrategy) -> MetadataCache {
        let cache = MetadataCache::with_config(&CacheConfig {
            initial_capacity: 4,
            strategy,
        });
        let barrier = Barrier::new(8);

        let results: Vec<Arc<Metadata>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get(&record_ptr()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for meta in &results {
            assert_eq!(meta.summary(), results[0].summary());
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.inflight.lock().is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 8);
        cache
    }

    #[test]
    fn test_concurrent_first_access() {
        let cache = concurrent_first_access(MissStrategy::DeriveOutsideLock);
        assert!(cache.stats().derivations >= 1);
    }

    #[test]
    fn test_single_flight_derives_once() {
        let cache = concurrent_first_access(MissStrategy::SingleFlight);
        assert_eq!(cache.strategy(), MissStrategy::SingleFlight);
        assert_eq!(cache.stats().derivations, 1);
    }

    #[test]
    fn test_concurrent_hits_are_counted() {
        let cache = MetadataCache::new();
        let first = cache.get(&record()).unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let hit = cache.get(&record_ptr()).unwrap();
                        assert!(Arc::ptr_eq(&hit, &first));
                    }
                });
            }
        });

        let stats = cache.stats();
        assert_eq!(stats.hits, 800);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.derivations, 1);
    }

    fn single_flight_cache() -> &'static MetadataCache {
        static CACHE: OnceLock<MetadataCache> = OnceLock::new();
        CACHE.get_or_init(|| {
            MetadataCache::with_config(&CacheConfig {
                initial_capacity: 4,
                strategy: MissStrategy::SingleFlight,
            })
        })
    }

    fn holder_fields() -> Vec<FieldDecl> {
        let inner = single_flight_cache().get(&record()).unwrap();
        vec![FieldDecl::new("Inner", inner.type_ref().clone(), 0).public()]
    }

    fn holder() -> TypeRef {
        TypeDescriptor::synthetic("cache.Holder", Kind::Struct)
            .with_fields(holder_fields)
            .into_ref()
    }

    #[test]
    fn test_single_flight_nested_lookup() {
        let cache = single_flight_cache();
        let meta = cache.get(&holder()).unwrap();

        assert_eq!(meta.num_field(), 1);
        assert_eq!(meta.fields()[0].ty(), &record());
        assert!(cache.contains(&record()));
        assert_eq!(cache.stats().derivations, 2);
        assert!(cache.inflight.lock().is_empty());
    }

    #[test]
    fn test_single_flight_failure_not_cached() {
        let cache = MetadataCache::with_config(&CacheConfig {
            initial_capacity: 4,
            strategy: MissStrategy::SingleFlight,
        });
        assert!(cache.get(&broken()).unwrap_err().is_tag_syntax());
        assert!(cache.is_empty());
        assert!(cache.inflight.lock().is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CacheConfig::from_lookup(|_| None);
        assert_eq!(config, CacheConfig::default());

        let config = CacheConfig::from_lookup(|name| match name {
            CAPACITY_ENV => Some("8".to_string()),
            STRATEGY_ENV => Some("single-flight".to_string()),
            _ => None,
        });
        assert_eq!(config.initial_capacity, 8);
        assert_eq!(config.strategy, MissStrategy::SingleFlight);

        let config = CacheConfig::from_lookup(|_| Some("lots".to_string()));
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_deserialize() {
        let config: CacheConfig = serde_json::from_str(r#"{"strategy":"single-flight"}"#).unwrap();
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.strategy, MissStrategy::SingleFlight);
    }
}
