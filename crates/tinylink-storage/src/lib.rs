//! Storage backends for short-code mappings.
//!
//! Every backend implements [`MappingStore`] and shares the same semantics:
//! one canonical code per original URL, owner-gated soft deletes, and
//! tombstones that are never cleared.

pub mod cached;
pub mod file;
mod index;
pub mod memory;
pub mod mysql;

#[cfg(test)]
mod suite;

pub use cached::{CacheConfig, CachedStore};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use tinylink_core::{
    InsertOutcome, MappingStore, ReadStore, Resolved, ShortMapping, StorageError, StoreStats,
};

/// Type alias for store results.
pub type Result<T> = std::result::Result<T, StorageError>;
