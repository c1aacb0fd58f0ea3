use crate::error::Result;
use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored association between a short code and the URL it redirects to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortMapping {
    /// Opaque record identifier, assigned at creation.
    pub id: Uuid,
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    pub owner_id: OwnerId,
    /// Tombstone flag. Only ever flips from `false` to `true`.
    pub deleted: bool,
    pub created_at: Timestamp,
}

impl ShortMapping {
    /// Builds a fresh, live mapping candidate.
    pub fn new(short_code: ShortCode, original_url: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            short_code,
            original_url: original_url.into(),
            owner_id,
            deleted: false,
            created_at: Timestamp::now(),
        }
    }
}

/// The result of looking up a short code that exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    pub original_url: String,
    /// Set when the mapping has been soft-deleted ("gone" rather than "missing").
    pub deleted: bool,
}

/// What [`MappingStore::insert`] did with a candidate mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The candidate was persisted; its short code is now canonical.
    Inserted,
    /// A mapping for the same original URL already exists. The candidate was
    /// discarded and this is the canonical code.
    AlreadyExists(ShortCode),
}

/// Aggregate counters over the stored mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of stored mappings, tombstoned ones included.
    pub urls: u64,
    /// Number of distinct non-anonymous owners.
    pub users: u64,
}

/// A read-only view of a mapping store.
#[async_trait]
pub trait ReadStore: Send + Sync + 'static {
    /// Looks up a short code. Returns `None` if no record matches; a
    /// tombstoned record is still returned, with `deleted` set.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Resolved>>;

    /// Returns every mapping owned by `owner`, tombstoned ones included.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>>;

    /// Verifies the backing medium is reachable.
    async fn health_check(&self) -> Result<()>;

    async fn stats(&self) -> Result<StoreStats>;
}

/// The authoritative short code to original URL mapping.
///
/// Implementations must make `insert` atomic with respect to original URL
/// uniqueness: two concurrent inserts for the same URL never both return
/// [`InsertOutcome::Inserted`].
#[async_trait]
pub trait MappingStore: ReadStore {
    /// Persists `mapping` unless its original URL is already stored, in which
    /// case the existing code is returned and nothing is written.
    async fn insert(&self, mapping: ShortMapping) -> Result<InsertOutcome>;

    /// Tombstones `code` if it is owned by `owner`.
    ///
    /// A missing code or an owner mismatch is a silent no-op. Returns `true`
    /// only when the flag actually flipped.
    async fn mark_deleted(&self, code: &ShortCode, owner: &OwnerId) -> Result<bool>;
}
