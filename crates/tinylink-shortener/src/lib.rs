//! URL shortener service implementation.
//!
//! This crate provides the deduplicating [`ShortenerService`], the bounded
//! batch pipeline it runs bulk operations on, and the ownership view used
//! for listings. Core types are re-exported from `tinylink_core`.

pub mod ownership;
pub mod pipeline;
pub mod service;

pub use ownership::{ListPolicy, MappingSummary, OwnershipIndex};
pub use pipeline::{BatchPipeline, BatchRun, Canceller};
pub use service::{ServiceConfig, ShortenerService};
pub use tinylink_core::{
    BatchCreateItem, BatchCreateResult, OwnerId, ShortCode, Shortened, Shortener, ShortenerError,
};
