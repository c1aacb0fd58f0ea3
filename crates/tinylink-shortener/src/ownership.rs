use serde::{Deserialize, Serialize};
use tinylink_core::{MappingStore, OwnerId, ShortMapping, StorageError};

/// Whether owner listings show tombstoned mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListPolicy {
    #[default]
    IncludeDeleted,
    ExcludeDeleted,
}

impl ListPolicy {
    pub fn admits(&self, mapping: &ShortMapping) -> bool {
        match self {
            ListPolicy::IncludeDeleted => true,
            ListPolicy::ExcludeDeleted => !mapping.deleted,
        }
    }
}

/// Answers "which mappings belong to this owner" on top of a store.
///
/// Holds no state of its own. Anonymous callers own nothing, even though
/// anonymously created mappings carry an empty owner id.
#[derive(Debug)]
pub struct OwnershipIndex<'a, S> {
    store: &'a S,
    policy: ListPolicy,
}

impl<'a, S: MappingStore> OwnershipIndex<'a, S> {
    pub fn new(store: &'a S, policy: ListPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>, StorageError> {
        if owner.is_anonymous() {
            return Ok(Vec::new());
        }

        let mut owned = self.store.list_by_owner(owner).await?;
        owned.retain(|mapping| self.policy.admits(mapping));
        Ok(owned)
    }
}

/// A mapping as shown to its owner, with the short link fully rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    pub short_url: String,
    pub original_url: String,
    pub deleted: bool,
}

impl MappingSummary {
    pub fn new(mapping: &ShortMapping, base_url: &str) -> Self {
        Self {
            short_url: mapping.short_code.to_url(base_url),
            original_url: mapping.original_url.clone(),
            deleted: mapping.deleted,
        }
    }
}
