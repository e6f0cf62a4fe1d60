//! In-memory entity source

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{DomainError, Entity, EntityFetcher, EntityKey, FetchContext};

/// Entity fetcher backed by a fixture map
///
/// Stands in for the remote data source: it can simulate latency and
/// per-key failures, and it counts every fetch it serves.
#[derive(Debug)]
pub struct InMemoryEntitySource<E: Entity> {
    entities: RwLock<HashMap<EntityKey, E>>,
    failures: RwLock<HashMap<EntityKey, String>>,
    calls: RwLock<HashMap<EntityKey, usize>>,
    total_calls: AtomicUsize,
    latency: Option<Duration>,
}

impl<E: Entity> InMemoryEntitySource<E> {
    /// Create a new empty source
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
            total_calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Create a source serving the given entities under their own keys
    pub fn with_entities<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let source = Self::new();
        {
            let mut map = source
                .entities
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            for entity in entities {
                map.insert(entity.key(), entity);
            }
        }
        source
    }

    /// Makes every fetch of `key` fail with a remote fetch error
    pub fn with_failure(self, key: impl Into<EntityKey>, message: impl Into<String>) -> Self {
        self.failures
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.into(), message.into());
        self
    }

    /// Delays every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds or replaces an entity
    pub fn insert(&self, entity: E) -> Result<(), DomainError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        entities.insert(entity.key(), entity);
        Ok(())
    }

    /// All entities currently served
    pub fn entities(&self) -> Result<Vec<E>, DomainError> {
        let entities = self
            .entities
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entities.values().cloned().collect())
    }

    /// Number of fetches served for `key`
    pub fn call_count(&self, key: &EntityKey) -> usize {
        self.calls
            .read()
            .map(|calls| calls.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of fetches served for all keys
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self, key: &EntityKey) -> Result<(), DomainError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let mut calls = self
            .calls
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;
        *calls.entry(key.clone()).or_insert(0) += 1;

        Ok(())
    }
}

impl<E: Entity> Default for InMemoryEntitySource<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> EntityFetcher<E> for InMemoryEntitySource<E> {
    async fn fetch(&self, ctx: &FetchContext, key: &EntityKey) -> Result<E, DomainError> {
        self.record_call(key)?;

        if let Some(latency) = self.latency {
            tokio::select! {
                _ = tokio::time::sleep(latency) => {}
                reason = ctx.cancelled() => return Err(DomainError::cancelled(reason)),
            }
        }

        let failure = self
            .failures
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?
            .get(key)
            .cloned();

        if let Some(message) = failure {
            return Err(DomainError::remote_fetch(key.as_str(), message));
        }

        let entities = self
            .entities
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        entities
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(key.as_str()))
    }
}
