//! Fetch capabilities injected into the loader

use async_trait::async_trait;

use super::{CancellationSignal, DomainError, Entity, EntityKey};

#[cfg(test)]
use mockall::automock;

/// Outcome of one batch call: either a top-level failure for the whole batch
/// or one result per requested key, positionally aligned with the keys.
pub type BatchOutcome<E> = Result<Vec<Result<E, DomainError>>, DomainError>;

/// Request context handed to every fetch
///
/// Carries the cancellation signal of the scope the fetch runs for, so a
/// source can stop early once nobody is waiting for its answer.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    cancellation: CancellationSignal,
}

impl FetchContext {
    pub fn new(cancellation: CancellationSignal) -> Self {
        Self { cancellation }
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves with the cancellation reason once the scope is cancelled
    pub async fn cancelled(&self) -> String {
        self.cancellation.cancelled().await
    }
}

/// Fetches a single entity from the remote source
///
/// This is the per-key capability a data source provides. Implementations
/// report a missing entity with [`DomainError::NotFound`] and any other
/// failure with [`DomainError::RemoteFetch`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntityFetcher<E: Entity>: Send + Sync {
    async fn fetch(&self, ctx: &FetchContext, key: &EntityKey) -> Result<E, DomainError>;
}

/// Fetches a whole batch of distinct keys in one call
#[async_trait]
pub trait BatchFetch<E: Entity>: Send + Sync {
    /// `keys` are distinct; a per-key result list must have the same length
    /// and order as `keys`.
    async fn fetch_batch(&self, ctx: &FetchContext, keys: &[EntityKey]) -> BatchOutcome<E>;
}
