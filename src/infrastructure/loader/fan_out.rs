//! Parallel per-key fan-out behind a batch call

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::warn;

use crate::domain::{
    BatchFetch, BatchOutcome, DomainError, Entity, EntityFetcher, EntityKey, FetchContext,
};

/// Adapts a per-key [`EntityFetcher`] into a [`BatchFetch`]
///
/// Every key of a batch is fetched in its own task; the batch returns once
/// all of them have finished. A panicking worker fails only its own key.
pub struct ConcurrentBatchFetch<E: Entity> {
    fetcher: Arc<dyn EntityFetcher<E>>,
}

impl<E: Entity> ConcurrentBatchFetch<E> {
    pub fn new(fetcher: Arc<dyn EntityFetcher<E>>) -> Self {
        Self { fetcher }
    }
}

impl<E: Entity> std::fmt::Debug for ConcurrentBatchFetch<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentBatchFetch")
            .field("kind", &E::KIND)
            .finish()
    }
}

#[async_trait]
impl<E: Entity> BatchFetch<E> for ConcurrentBatchFetch<E> {
    async fn fetch_batch(&self, ctx: &FetchContext, keys: &[EntityKey]) -> BatchOutcome<E> {
        let mut workers = JoinSet::new();

        for (index, key) in keys.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let ctx = ctx.clone();
            workers.spawn(async move { (index, fetcher.fetch(&ctx, &key).await) });
        }

        let mut slots: Vec<Option<Result<E, DomainError>>> = vec![None; keys.len()];

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(kind = %E::KIND, error = %e, "Fetch worker did not complete"),
            }
        }

        Ok(slots
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| {
                slot.unwrap_or_else(|| {
                    Err(DomainError::internal(format!(
                        "Fetch worker for '{}' did not complete",
                        key
                    )))
                })
            })
            .collect())
    }
}
