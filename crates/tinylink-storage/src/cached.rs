use crate::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tinylink_core::{
    InsertOutcome, MappingStore, OwnerId, ReadStore, Resolved, ShortCode, ShortMapping,
    StoreStats,
};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Configuration for the resolve cache in front of a store.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = 10_000)]
    max_capacity: u64,
    /// Time-to-live for cache entries.
    #[builder(default = Duration::from_secs(60))]
    ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A store decorator that caches resolve results in memory.
///
/// Only found codes are cached; a miss always reaches the inner store, so a
/// code that is created later is visible immediately. Writes pass through.
///
/// A successful [`MappingStore::mark_deleted`] overwrites the entry with the
/// tombstone, while a resolve only fills an empty slot. A fill racing with a
/// delete therefore never puts the live mapping back.
#[derive(Debug, Clone)]
pub struct CachedStore<S> {
    inner: S,
    cache: Cache<ShortCode, Resolved>,
}

impl<S: MappingStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: S, config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        Self { inner, cache }
    }

    /// Returns a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Invalidate a cached entry.
    pub async fn invalidate(&self, code: &ShortCode) {
        trace!(code = %code, "invalidating cache entry");
        self.cache.invalidate(code).await;
    }
}

#[async_trait]
impl<S: MappingStore> ReadStore for CachedStore<S> {
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Resolved>> {
        if let Some(hit) = self.cache.get(code).await {
            debug!(code = %code, "resolve cache hit");
            return Ok(Some(hit));
        }

        trace!(code = %code, "resolve cache miss, asking inner store");
        let Some(resolved) = self.inner.resolve(code).await? else {
            return Ok(None);
        };
        let entry = self.cache.entry(code.clone()).or_insert(resolved).await;
        Ok(Some(entry.into_value()))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>> {
        self.inner.list_by_owner(owner).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.inner.stats().await
    }
}

#[async_trait]
impl<S: MappingStore> MappingStore for CachedStore<S> {
    async fn insert(&self, mapping: ShortMapping) -> Result<InsertOutcome> {
        self.inner.insert(mapping).await
    }

    async fn mark_deleted(&self, code: &ShortCode, owner: &OwnerId) -> Result<bool> {
        let flipped = self.inner.mark_deleted(code, owner).await?;
        if !flipped {
            return Ok(false);
        }

        match self.inner.resolve(code).await {
            Ok(Some(tombstone)) => self.cache.insert(code.clone(), tombstone).await,
            Ok(None) => self.invalidate(code).await,
            Err(err) => {
                warn!(code = %code, error = %err, "could not read tombstone, dropping cache entry");
                self.invalidate(code).await;
            }
        }
        Ok(true)
    }
}
