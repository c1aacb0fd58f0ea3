use crate::index::MappingIndex;
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tinylink_core::{
    InsertOutcome, MappingStore, OwnerId, ReadStore, Resolved, ShortCode, ShortMapping,
    StoreStats,
};
use tracing::trace;

/// In-memory implementation of the mapping store.
///
/// A single exclusive lock guards both indexes, so the URL uniqueness check
/// and the write form one critical section. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    index: Mutex<MappingIndex>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            index: Mutex::new(MappingIndex::new()),
        }
    }

    /// Number of stored mappings, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadStore for InMemoryStore {
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Resolved>> {
        Ok(self.index.lock().resolve(code))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>> {
        Ok(self.index.lock().list_by_owner(owner))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(self.index.lock().stats())
    }
}

#[async_trait]
impl MappingStore for InMemoryStore {
    async fn insert(&self, mapping: ShortMapping) -> Result<InsertOutcome> {
        trace!(code = %mapping.short_code, "inserting mapping in memory");
        self.index.lock().try_insert(mapping)
    }

    async fn mark_deleted(&self, code: &ShortCode, owner: &OwnerId) -> Result<bool> {
        Ok(self.index.lock().tombstone(code, owner))
    }
}
