use crate::error::ShortenerError;
use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use crate::store::{Resolved, ShortMapping, StoreStats};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, ShortenerError>;

/// Successful outcome of shortening a URL.
///
/// A duplicate is a routine result, not an error: it carries the canonical
/// code that was minted for the URL earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// A new mapping was stored under this code.
    Created(ShortCode),
    /// The URL was already shortened; this is the existing code.
    Duplicate(ShortCode),
}

impl Shortened {
    pub fn code(&self) -> &ShortCode {
        match self {
            Shortened::Created(code) | Shortened::Duplicate(code) => code,
        }
    }

    pub fn into_code(self) -> ShortCode {
        match self {
            Shortened::Created(code) | Shortened::Duplicate(code) => code,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Shortened::Duplicate(_))
    }
}

/// One entry of a bulk create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCreateItem {
    /// Caller-supplied token echoed back in the matching result.
    pub correlation_id: String,
    pub original_url: String,
}

/// The result slot of one bulk create item.
#[derive(Debug, Clone)]
pub struct BatchCreateResult {
    pub correlation_id: String,
    pub outcome: Result<Shortened>,
}

impl BatchCreateResult {
    /// The new or pre-existing code, `None` if the item failed.
    pub fn short_code(&self) -> Option<&ShortCode> {
        self.outcome.as_ref().ok().map(Shortened::code)
    }
}

/// The operations the shortening core exposes to transport layers.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens one URL, deduplicating against already stored URLs.
    async fn create_one(&self, original_url: &str, owner: &OwnerId) -> Result<Shortened>;

    /// Shortens many URLs concurrently. Every input item yields exactly one
    /// result; results are in completion order, not input order.
    async fn create_batch(
        &self,
        items: Vec<BatchCreateItem>,
        owner: OwnerId,
    ) -> Result<Vec<BatchCreateResult>>;

    /// Resolves a short code. Tombstoned mappings resolve with `deleted` set;
    /// unknown codes yield [`ShortenerError::NotFound`].
    async fn resolve(&self, code: &ShortCode) -> Result<Resolved>;

    /// Lists the mappings owned by `owner`. An empty list is a valid result.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>>;

    /// Accepts a bulk soft-delete and returns immediately. The deletes run in
    /// the background; failures are logged and never reported back.
    async fn delete_batch(&self, codes: Vec<ShortCode>, owner: OwnerId) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    async fn stats(&self) -> Result<StoreStats>;
}
