use crate::ownership::{ListPolicy, OwnershipIndex};
use crate::pipeline::{BatchPipeline, DEFAULT_WORKERS};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tinylink_core::{
    BatchCreateItem, BatchCreateResult, InsertOutcome, MappingStore, OwnerId, Resolved, ShortCode,
    ShortMapping, Shortened, Shortener, ShortenerError, StoreStats,
};
use tinylink_generator::Generator;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, ShortenerError>;

/// Tunables of the shortener service.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServiceConfig {
    /// Deadline of a single create or bulk create call.
    #[builder(default = Duration::from_secs(10))]
    pub request_timeout: Duration,
    /// Worker count of the bulk pipelines.
    #[builder(default = DEFAULT_WORKERS)]
    pub batch_workers: usize,
    #[builder(default)]
    pub list_policy: ListPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the [`Shortener`] trait.
///
/// Wraps a [`MappingStore`] and a [`Generator`]. Deduplication relies on the
/// store's insert being atomic with respect to the original URL; the service
/// neither locks across calls nor retries a collided code.
#[derive(Debug)]
pub struct ShortenerService<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
    pipeline: BatchPipeline,
    config: ServiceConfig,
}

impl<S, G> Clone for ShortenerService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            pipeline: self.pipeline,
            config: self.config.clone(),
        }
    }
}

impl<S: MappingStore, G: Generator> ShortenerService<S, G> {
    pub fn new(store: S, generator: G) -> Self {
        Self::with_config(store, generator, ServiceConfig::default())
    }

    pub fn with_config(store: S, generator: G, config: ServiceConfig) -> Self {
        Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
            pipeline: BatchPipeline::new(config.batch_workers),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Trims surrounding whitespace and rejects an empty URL.
fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ShortenerError::EmptyUrl);
    }
    Ok(url.to_string())
}

/// Inserts a freshly generated candidate and reports whether it became the
/// canonical code or the URL already had one.
async fn shorten<S: MappingStore, G: Generator>(
    store: &S,
    generator: &G,
    original_url: String,
    owner: OwnerId,
) -> Result<Shortened> {
    let candidate: ShortCode = generator.generate().into();
    let mapping = ShortMapping::new(candidate.clone(), original_url, owner);

    match store.insert(mapping).await? {
        InsertOutcome::Inserted => {
            debug!(code = %candidate, "stored new mapping");
            Ok(Shortened::Created(candidate))
        }
        InsertOutcome::AlreadyExists(existing) => {
            debug!(code = %existing, discarded = %candidate, "url already shortened");
            Ok(Shortened::Duplicate(existing))
        }
    }
}

#[async_trait]
impl<S: MappingStore, G: Generator> Shortener for ShortenerService<S, G> {
    async fn create_one(&self, original_url: &str, owner: &OwnerId) -> Result<Shortened> {
        let original_url = validate_url(original_url)?;

        timeout(
            self.config.request_timeout,
            shorten(&*self.store, &*self.generator, original_url, owner.clone()),
        )
        .await
        .map_err(|_| {
            warn!(owner = %owner, "create exceeded deadline");
            ShortenerError::Timeout
        })?
    }

    async fn create_batch(
        &self,
        items: Vec<BatchCreateItem>,
        owner: OwnerId,
    ) -> Result<Vec<BatchCreateResult>> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }
        let requested = items.len();

        let store = Arc::clone(&self.store);
        let generator = Arc::clone(&self.generator);
        let run = self.pipeline.run(items, move |item: BatchCreateItem| {
            let store = Arc::clone(&store);
            let generator = Arc::clone(&generator);
            let owner = owner.clone();
            async move {
                let outcome = match validate_url(&item.original_url) {
                    Ok(url) => shorten(&*store, &*generator, url, owner).await,
                    Err(err) => Err(err),
                };
                if let Err(ref err) = outcome {
                    warn!(correlation_id = %item.correlation_id, error = %err, "batch item failed");
                }
                BatchCreateResult {
                    correlation_id: item.correlation_id,
                    outcome,
                }
            }
        });

        let canceller = run.canceller();
        let results = match timeout(self.config.request_timeout, run.collect()).await {
            Ok(results) => results,
            Err(_) => {
                canceller.cancel();
                warn!(items = requested, "bulk create exceeded deadline, cancelled");
                return Err(ShortenerError::Timeout);
            }
        };

        let unavailable = results
            .iter()
            .filter_map(|result| match &result.outcome {
                Err(err @ ShortenerError::StorageUnavailable(_)) => Some(err),
                _ => None,
            })
            .collect::<Vec<_>>();
        if unavailable.len() == results.len() {
            if let Some(err) = unavailable.first() {
                error!(items = requested, error = %err, "bulk create failed, storage unavailable");
                return Err((*err).clone());
            }
        }

        info!(items = requested, "bulk create finished");
        Ok(results)
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Resolved> {
        self.store
            .resolve(code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>> {
        let index = OwnershipIndex::new(&*self.store, self.config.list_policy);
        Ok(index.list(owner).await?)
    }

    async fn delete_batch(&self, codes: Vec<ShortCode>, owner: OwnerId) -> Result<()> {
        if codes.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }
        let requested = codes.len();

        let store = Arc::clone(&self.store);
        let scoped_owner = owner.clone();
        let run = self.pipeline.run(codes, move |code: ShortCode| {
            let store = Arc::clone(&store);
            let owner = scoped_owner.clone();
            async move {
                let result = store.mark_deleted(&code, &owner).await;
                (code, result)
            }
        });

        tokio::spawn(async move {
            let mut deleted = 0usize;
            for (code, result) in run.collect().await {
                match result {
                    Ok(true) => deleted += 1,
                    Ok(false) => {
                        debug!(code = %code, owner = %owner, "not owned or already deleted, skipped")
                    }
                    Err(err) => error!(code = %code, owner = %owner, error = %err, "soft delete failed"),
                }
            }
            info!(owner = %owner, requested, deleted, "bulk delete finished");
        });

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(self.store.health_check().await?)
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }
}
