//! Typed loader facade

use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, trace};

use super::{
    BatchDispatcher, CancellationSignal, ConcurrentBatchFetch, EntryState, LoaderConfig,
    LoaderStats, LoaderStatsSnapshot, PendingValue, ScopedCache,
};
use crate::domain::{
    BatchFetch, DomainError, Entity, EntityFetcher, EntityKey, LoadResults, Page,
};
use crate::infrastructure::observability;

/// Batching, deduplicating, scope-cached loader for one entity kind
///
/// A loader belongs to exactly one request scope. Every key is fetched at
/// most once during the loader's lifetime; later requests for the key get
/// the memoized outcome, error included.
///
/// Once the scope is cancelled or dropped the loader serves nothing: every
/// load and prime fails with a cancellation error, even for keys that were
/// already resolved, and the cached entities are discarded.
pub struct Loader<E: Entity> {
    cache: ScopedCache<E>,
    dispatcher: Arc<BatchDispatcher<E>>,
    cancellation: CancellationSignal,
    stats: Arc<LoaderStats>,
}

impl<E: Entity> Loader<E> {
    pub fn new(
        fetcher: Arc<dyn BatchFetch<E>>,
        config: LoaderConfig,
        cancellation: CancellationSignal,
    ) -> Self {
        let stats = Arc::new(LoaderStats::new());
        let dispatcher = Arc::new(BatchDispatcher::new(
            fetcher,
            config,
            cancellation.clone(),
            Arc::clone(&stats),
        ));

        Self {
            cache: ScopedCache::new(),
            dispatcher,
            cancellation,
            stats,
        }
    }

    /// Builds a loader that fans each batch out to a per-key fetcher
    pub fn from_fetcher(
        fetcher: Arc<dyn EntityFetcher<E>>,
        config: LoaderConfig,
        cancellation: CancellationSignal,
    ) -> Self {
        Self::new(
            Arc::new(ConcurrentBatchFetch::new(fetcher)),
            config,
            cancellation,
        )
    }

    /// Loads a single entity
    ///
    /// The key joins the current batch window as soon as this is called; the
    /// returned future only waits for the outcome.
    pub fn load_one(
        &self,
        key: impl Into<EntityKey>,
    ) -> BoxFuture<'static, Result<E, DomainError>> {
        let pending = self.pending(key.into());

        async move { pending?.await }.boxed()
    }

    /// Loads several entities, one result slot per input key, in input order
    ///
    /// Duplicate keys each get their own slot and share one fetch.
    pub fn load_many<I>(&self, keys: I) -> BoxFuture<'static, LoadResults<E>>
    where
        I: IntoIterator,
        I::Item: Into<EntityKey>,
    {
        let pending: Vec<_> = keys
            .into_iter()
            .map(|key| self.pending(key.into()))
            .collect();

        async move {
            join_all(pending.into_iter().map(|p| async move { p?.await }))
                .await
                .into_iter()
                .collect::<LoadResults<E>>()
        }
        .boxed()
    }

    /// Seeds the cache with already known entities, keyed by their own URL
    ///
    /// Keys that are already cached, pending or resolved, are left alone.
    /// Returns how many entities were inserted.
    pub fn prime<I>(&self, entities: I) -> Result<usize, DomainError>
    where
        I: IntoIterator<Item = E>,
    {
        self.ensure_live()?;

        let mut primed = 0;

        for entity in entities {
            if self.cache.prime(entity.key(), entity)? {
                primed += 1;
            }
        }

        if primed > 0 {
            self.stats.record_primed(primed);
            observability::record_primed(E::KIND, primed);
        }

        debug!(kind = %E::KIND, primed, "Primed loader cache");

        Ok(primed)
    }

    /// Primes every entity embedded in a list page
    pub fn prime_page(&self, page: &Page<E>) -> Result<usize, DomainError> {
        self.prime(page.results.iter().cloned())
    }

    /// State of the cache entry for `key`, if any
    pub fn state(&self, key: &EntityKey) -> Result<Option<EntryState<E>>, DomainError> {
        self.cache.state(key)
    }

    /// Number of keys cached in this scope
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Drops every cached entity
    pub(crate) fn discard(&self) {
        let discarded = self.cache.clear();

        if discarded > 0 {
            debug!(kind = %E::KIND, discarded, "Discarded loader cache");
        }
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        match self.cancellation.reason() {
            None => Ok(()),
            Some(reason) => {
                self.discard();
                Err(DomainError::cancelled(reason))
            }
        }
    }

    fn pending(&self, key: EntityKey) -> Result<PendingValue<E>, DomainError> {
        self.ensure_live()?;

        let entry = self
            .cache
            .get_or_create(&key, || self.dispatcher.request_key(key.clone()))?;

        if !entry.created {
            trace!(kind = %E::KIND, key = %key, "Loader cache hit");
            self.stats.record_cache_hit();
            observability::record_cache_hit(E::KIND);
        }

        Ok(entry.value)
    }
}

impl<E: Entity> std::fmt::Debug for Loader<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("kind", &E::KIND)
            .field("cache", &self.cache)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Film, Planet};
    use crate::infrastructure::source::InMemoryEntitySource;
    use std::time::Duration;

    const TATOOINE: &str = "https://swapi.dev/api/planets/1/";
    const ALDERAAN: &str = "https://swapi.dev/api/planets/2/";
    const YAVIN: &str = "https://swapi.dev/api/planets/3/";
    const KAMINO: &str = "https://swapi.dev/api/planets/10/";

    fn planets() -> Arc<InMemoryEntitySource<Planet>> {
        Arc::new(InMemoryEntitySource::with_entities([
            Planet::new(TATOOINE, "Tatooine"),
            Planet::new(ALDERAAN, "Alderaan"),
            Planet::new(YAVIN, "Yavin IV"),
        ]))
    }

    fn loader(source: Arc<InMemoryEntitySource<Planet>>) -> Loader<Planet> {
        Loader::from_fetcher(source, LoaderConfig::default(), CancellationSignal::new())
    }

    #[tokio::test]
    async fn test_load_one() {
        let source = planets();
        let loader = loader(source.clone());

        let planet = loader.load_one(TATOOINE).await.unwrap();
        assert_eq!(planet.name, "Tatooine");
        assert_eq!(source.call_count(&EntityKey::from(TATOOINE)), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_of_one_key_fetch_once() {
        let source = planets();
        let loader = loader(source.clone());

        let loads: Vec<_> = (0..10).map(|_| loader.load_one(TATOOINE)).collect();
        let results = join_all(loads).await;

        assert!(results.iter().all(|r| r.as_ref().unwrap().name == "Tatooine"));
        assert_eq!(source.total_calls(), 1);

        let stats = loader.stats();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.keys_fetched, 1);
        assert_eq!(stats.cache_hits, 9);
    }

    #[tokio::test]
    async fn test_resolved_outcomes_are_memoized() {
        let source = planets();
        let loader = loader(source.clone());

        loader.load_one(ALDERAAN).await.unwrap();
        let missing = loader.load_one(KAMINO).await.unwrap_err();
        assert!(missing.is_not_found());

        loader.load_one(ALDERAAN).await.unwrap();
        let again = loader.load_one(KAMINO).await.unwrap_err();
        assert_eq!(again, missing);

        assert_eq!(source.call_count(&EntityKey::from(ALDERAAN)), 1);
        assert_eq!(source.call_count(&EntityKey::from(KAMINO)), 1);
        assert_eq!(
            loader.state(&EntityKey::from(KAMINO)).unwrap(),
            Some(EntryState::Failed(missing))
        );
    }

    #[tokio::test]
    async fn test_load_many_preserves_input_order_and_duplicates() {
        let source = planets();
        let loader = loader(source.clone());

        let results = loader
            .load_many([YAVIN, TATOOINE, ALDERAAN, TATOOINE])
            .await;

        let names: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["Yavin IV", "Tatooine", "Alderaan", "Tatooine"]);
        assert_eq!(results.get(1).unwrap(), results.get(3).unwrap());

        assert_eq!(source.total_calls(), 3);
        assert_eq!(loader.stats().batches, 1);
    }

    #[tokio::test]
    async fn test_load_many_isolates_failed_keys() {
        let source = Arc::new(
            InMemoryEntitySource::with_entities([
                Planet::new(TATOOINE, "Tatooine"),
                Planet::new(ALDERAAN, "Alderaan"),
            ])
            .with_failure(ALDERAAN, "connection reset"),
        );
        let loader = loader(source);

        let results = loader.load_many([TATOOINE, ALDERAAN]).await;

        assert!(results.get(0).unwrap().is_ok());
        assert_eq!(
            results.get(1).unwrap().as_ref().unwrap_err(),
            &DomainError::remote_fetch(ALDERAAN, "connection reset")
        );
        assert_eq!(
            results.without_errors(),
            vec![Planet::new(TATOOINE, "Tatooine")]
        );
    }

    #[tokio::test]
    async fn test_load_many_empty() {
        let loader = loader(planets());
        let results = loader.load_many(Vec::<String>::new()).await;
        assert!(results.is_empty());
        assert_eq!(loader.stats().batches, 0);
    }

    #[tokio::test]
    async fn test_prime_before_load_skips_fetch() {
        let source = planets();
        let loader = loader(source.clone());

        let primed = Planet::new(KAMINO, "Kamino");
        assert_eq!(loader.prime([primed.clone()]).unwrap(), 1);

        let planet = loader.load_one(KAMINO).await.unwrap();
        assert_eq!(planet, primed);
        assert_eq!(source.total_calls(), 0);
        assert_eq!(loader.stats().primed, 1);
    }

    #[tokio::test]
    async fn test_prime_after_pending_is_noop() {
        let source = Arc::new(
            InMemoryEntitySource::with_entities([Planet::new(TATOOINE, "Tatooine")])
                .with_latency(Duration::from_millis(10)),
        );
        let loader = loader(source.clone());

        let load = loader.load_one(TATOOINE);
        assert_eq!(
            loader.state(&EntityKey::from(TATOOINE)).unwrap(),
            Some(EntryState::Pending)
        );

        let primed = loader.prime([Planet::new(TATOOINE, "Not Tatooine")]).unwrap();
        assert_eq!(primed, 0);

        assert_eq!(load.await.unwrap().name, "Tatooine");
        assert_eq!(source.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_prime_does_not_overwrite_resolved_entry() {
        let loader = loader(planets());

        loader.load_one(TATOOINE).await.unwrap();
        assert_eq!(loader.prime([Planet::new(TATOOINE, "Other")]).unwrap(), 0);

        assert_eq!(loader.load_one(TATOOINE).await.unwrap().name, "Tatooine");
    }

    #[tokio::test]
    async fn test_cancelled_loader_stops_serving_resolved_keys() {
        let source = planets();
        let cancellation = CancellationSignal::new();
        let loader = Loader::from_fetcher(
            source.clone(),
            LoaderConfig::default(),
            cancellation.clone(),
        );

        loader.load_one(TATOOINE).await.unwrap();
        cancellation.cancel("client disconnected");

        let results = loader.load_many([TATOOINE, ALDERAAN]).await;
        assert!(results.iter().all(|r| r.as_ref().unwrap_err().is_cancelled()));
        assert_eq!(
            loader.prime([Planet::new(YAVIN, "Yavin IV")]).unwrap_err(),
            DomainError::cancelled("client disconnected")
        );
        assert_eq!(loader.cached_keys(), 0);
        assert_eq!(source.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_prime_page() {
        let source: Arc<InMemoryEntitySource<Film>> = Arc::new(InMemoryEntitySource::new());
        let loader = Loader::from_fetcher(
            source.clone(),
            LoaderConfig::default(),
            CancellationSignal::new(),
        );

        let page = Page::new(vec![
            Film::new("https://swapi.dev/api/films/1/", "A New Hope"),
            Film::new("https://swapi.dev/api/films/2/", "The Empire Strikes Back"),
        ]);
        assert_eq!(loader.prime_page(&page).unwrap(), 2);

        let results = loader
            .load_many([
                "https://swapi.dev/api/films/2/",
                "https://swapi.dev/api/films/1/",
            ])
            .await;
        assert_eq!(results.without_errors().len(), 2);
        assert_eq!(source.total_calls(), 0);
        assert_eq!(loader.cached_keys(), 2);
    }
}
