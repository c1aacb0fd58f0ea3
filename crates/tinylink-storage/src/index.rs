use std::collections::{HashMap, HashSet};
use tinylink_core::{
    InsertOutcome, OwnerId, Resolved, ShortCode, ShortMapping, StorageError, StoreStats,
};

/// In-memory index over mappings, keyed both by short code and by original URL.
///
/// The index is not synchronised; every store wraps it in a single lock so
/// that the uniqueness check and the write happen in one critical section.
#[derive(Debug, Default)]
pub(crate) struct MappingIndex {
    by_code: HashMap<ShortCode, ShortMapping>,
    by_url: HashMap<String, ShortCode>,
}

impl MappingIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Checks whether `mapping` may be inserted.
    ///
    /// Returns the canonical code when its URL is already stored, and an error
    /// when its code is taken by another URL.
    pub(crate) fn existing_code(
        &self,
        mapping: &ShortMapping,
    ) -> Result<Option<ShortCode>, StorageError> {
        if let Some(code) = self.by_url.get(&mapping.original_url) {
            return Ok(Some(code.clone()));
        }
        if self.by_code.contains_key(&mapping.short_code) {
            return Err(StorageError::CodeCollision(mapping.short_code.to_string()));
        }
        Ok(None)
    }

    /// Inserts `mapping` unless its URL is already indexed.
    pub(crate) fn try_insert(
        &mut self,
        mapping: ShortMapping,
    ) -> Result<InsertOutcome, StorageError> {
        if let Some(existing) = self.existing_code(&mapping)? {
            return Ok(InsertOutcome::AlreadyExists(existing));
        }
        self.apply(mapping);
        Ok(InsertOutcome::Inserted)
    }

    /// Writes `mapping` unconditionally with last-write-wins semantics for both
    /// its code and its URL. A tombstone is never cleared by a later record.
    pub(crate) fn apply(&mut self, mut mapping: ShortMapping) {
        if let Some(previous_code) = self.by_url.get(&mapping.original_url) {
            if previous_code != &mapping.short_code {
                self.by_code.remove(previous_code);
            }
        }

        if let Some(previous) = self.by_code.get(&mapping.short_code) {
            if previous.original_url != mapping.original_url {
                self.by_url.remove(&previous.original_url);
            } else {
                mapping.deleted |= previous.deleted;
            }
        }

        self.by_url
            .insert(mapping.original_url.clone(), mapping.short_code.clone());
        self.by_code.insert(mapping.short_code.clone(), mapping);
    }

    pub(crate) fn resolve(&self, code: &ShortCode) -> Option<Resolved> {
        self.by_code.get(code).map(|mapping| Resolved {
            original_url: mapping.original_url.clone(),
            deleted: mapping.deleted,
        })
    }

    /// Mappings owned by `owner`, oldest first.
    pub(crate) fn list_by_owner(&self, owner: &OwnerId) -> Vec<ShortMapping> {
        let mut owned: Vec<ShortMapping> = self
            .by_code
            .values()
            .filter(|mapping| &mapping.owner_id == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.short_code.cmp(&b.short_code))
        });
        owned
    }

    /// The tombstoned version of `code` if `owner` may delete it and it is
    /// still live. Anonymous callers never own anything.
    pub(crate) fn tombstone_of(&self, code: &ShortCode, owner: &OwnerId) -> Option<ShortMapping> {
        if owner.is_anonymous() {
            return None;
        }
        let mapping = self.by_code.get(code)?;
        if mapping.deleted || &mapping.owner_id != owner {
            return None;
        }
        Some(ShortMapping {
            deleted: true,
            ..mapping.clone()
        })
    }

    /// Tombstones `code` in place. Returns `true` when the flag flipped.
    pub(crate) fn tombstone(&mut self, code: &ShortCode, owner: &OwnerId) -> bool {
        match self.tombstone_of(code, owner) {
            Some(tombstoned) => {
                self.apply(tombstoned);
                true
            }
            None => false,
        }
    }

    pub(crate) fn stats(&self) -> StoreStats {
        let users: HashSet<&OwnerId> = self
            .by_code
            .values()
            .map(|mapping| &mapping.owner_id)
            .filter(|owner| !owner.is_anonymous())
            .collect();

        StoreStats {
            urls: self.by_code.len() as u64,
            users: users.len() as u64,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_code.len()
    }
}
