//! Memoizing cache in front of a metadata provider.

use crate::model::{EntityModel, MetadataProvider};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, OnceLock, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

// Process-wide instance, installed once at startup.
static GLOBAL: OnceLock<Arc<ModelCache>> = OnceLock::new();

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
}

///
/// ModelCache
///
/// Computes each entity description at most once per key and shares it as an
/// `Arc`. Concurrent first requests for the same key may both consult the
/// provider; the first insert wins and both callers observe it.
///

pub struct ModelCache {
    provider: Box<dyn MetadataProvider>,
    entities: RwLock<BTreeMap<String, Arc<EntityModel>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ModelCache {
    pub fn new(provider: impl MetadataProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            entities: RwLock::new(BTreeMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Install the process-wide cache. Returns the already-installed cache
    /// when called more than once.
    pub fn install_global(provider: impl MetadataProvider + 'static) -> Arc<Self> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::new(provider)))
            .clone()
    }

    /// The process-wide cache, if one has been installed.
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL.get().cloned()
    }

    /// Look up an entity, consulting the provider on first use.
    #[must_use]
    pub fn get(&self, entity: &str) -> Option<Arc<EntityModel>> {
        let cached = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned();
        if let Some(model) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(model);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(entity, "entity metadata cache miss");

        // provider runs outside the lock
        let model = Arc::new(self.provider.entity(entity)?);
        let mut guard = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        Some(guard.entry(entity.to_string()).or_insert(model).clone())
    }

    // Stats are best-effort only; relaxed atomics are enough.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let size = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size,
        }
    }

    /// Drop every memoized entry and reset the counters.
    pub fn clear(&self) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
