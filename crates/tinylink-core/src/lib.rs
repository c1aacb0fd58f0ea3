//! Core types and traits for the tinylink URL shortener.
//!
//! This crate holds the domain model shared by the storage backends, the
//! shortener service, and the gateway.

pub mod error;
pub mod owner;
pub mod shortcode;
pub mod shortener;
pub mod store;

pub use error::{ShortenerError, StorageError};
pub use owner::OwnerId;
pub use shortcode::{ShortCode, CODE_LENGTH};
pub use shortener::{BatchCreateItem, BatchCreateResult, Shortened, Shortener};
pub use store::{InsertOutcome, MappingStore, ReadStore, Resolved, ShortMapping, StoreStats};
