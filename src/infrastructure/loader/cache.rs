//! Scope-lifetime memoization of per-key futures

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::domain::{DomainError, EntityKey};

/// A cached value: a shared future every requester of the key awaits
///
/// Once resolved it yields the same outcome to every clone.
pub type PendingValue<E> = Shared<BoxFuture<'static, Result<E, DomainError>>>;

/// Observable state of a cache entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState<E> {
    Pending,
    Resolved(E),
    Failed(DomainError),
}

/// Result of [`ScopedCache::get_or_create`]
pub struct CacheEntry<E> {
    pub value: PendingValue<E>,
    /// True when this call inserted the entry and triggered `compute`
    pub created: bool,
}

/// Key to pending-or-resolved value map owned by one request scope
///
/// `get_or_create` is the only place a fetch is triggered, and it does so
/// under the map lock, so a key is computed at most once per cache.
pub struct ScopedCache<E> {
    entries: Mutex<HashMap<EntityKey, PendingValue<E>>>,
}

impl<E> ScopedCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &EntityKey) -> Result<Option<PendingValue<E>>, DomainError> {
        let entries = self.lock()?;
        Ok(entries.get(key).cloned())
    }

    /// Returns the entry for `key`, inserting `compute()` if it is absent
    pub fn get_or_create<F, Fut>(
        &self,
        key: &EntityKey,
        compute: F,
    ) -> Result<CacheEntry<E>, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, DomainError>> + Send + 'static,
    {
        let mut entries = self.lock()?;

        match entries.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(CacheEntry {
                value: entry.get().clone(),
                created: false,
            }),
            Entry::Vacant(entry) => {
                let value = compute().boxed().shared();
                entry.insert(value.clone());

                Ok(CacheEntry {
                    value,
                    created: true,
                })
            }
        }
    }

    /// Inserts an already resolved value unless the key is present
    pub fn prime(&self, key: EntityKey, value: E) -> Result<bool, DomainError> {
        let mut entries = self.lock()?;

        match entries.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                let value = future::ready(Ok(value)).boxed().shared();
                // Drive the ready future to completion so `state` sees it resolved.
                let _ = value.clone().now_or_never();
                entry.insert(value);
                Ok(true)
            }
        }
    }

    pub fn state(&self, key: &EntityKey) -> Result<Option<EntryState<E>>, DomainError> {
        let entries = self.lock()?;

        Ok(entries.get(key).map(|value| match value.peek() {
            None => EntryState::Pending,
            Some(Ok(entity)) => EntryState::Resolved(entity.clone()),
            Some(Err(e)) => EntryState::Failed(e.clone()),
        }))
    }

    /// Removes every entry; returns how many were removed
    ///
    /// Requesters already holding a pending value still receive its outcome.
    pub fn clear(&self) -> usize {
        match self.lock() {
            Ok(mut entries) => {
                let removed = entries.len();
                entries.clear();
                removed
            }
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<EntityKey, PendingValue<E>>>, DomainError> {
        self.entries
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to acquire cache lock: {}", e)))
    }
}

impl<E> Default for ScopedCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ScopedCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedCache")
            .field("entries", &self.len())
            .finish()
    }
}
