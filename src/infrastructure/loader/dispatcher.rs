//! Coalesces per-key requests into batch calls

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{CancellationSignal, LoaderConfig, LoaderStats};
use crate::domain::{BatchFetch, BatchOutcome, DomainError, Entity, EntityKey, FetchContext};
use crate::infrastructure::observability;

type Waiter<E> = oneshot::Sender<Result<E, DomainError>>;

/// Keys requested since the last flush, in first-request order
struct BatchWindow<E> {
    keys: Vec<EntityKey>,
    waiters: HashMap<EntityKey, Vec<Waiter<E>>>,
}

impl<E> BatchWindow<E> {
    fn push(&mut self, key: EntityKey, waiter: Waiter<E>) {
        match self.waiters.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().push(waiter),
            Entry::Vacant(entry) => {
                self.keys.push(entry.key().clone());
                entry.insert(vec![waiter]);
            }
        }
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<E> Default for BatchWindow<E> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            waiters: HashMap::new(),
        }
    }
}

/// Turns individual key requests into one batch call per window
///
/// A window is flushed by the first waiter that has yielded
/// `LoaderConfig::yield_count` times, or as soon as it reaches
/// `LoaderConfig::max_batch_size` keys. Each flushed window runs in its own
/// task, so results reach every waiter even if the waiter that flushed it
/// stops polling.
pub struct BatchDispatcher<E: Entity> {
    fetcher: Arc<dyn BatchFetch<E>>,
    config: LoaderConfig,
    cancellation: CancellationSignal,
    stats: Arc<LoaderStats>,
    window: Mutex<BatchWindow<E>>,
}

impl<E: Entity> BatchDispatcher<E> {
    pub fn new(
        fetcher: Arc<dyn BatchFetch<E>>,
        config: LoaderConfig,
        cancellation: CancellationSignal,
        stats: Arc<LoaderStats>,
    ) -> Self {
        Self {
            fetcher,
            config,
            cancellation,
            stats,
            window: Mutex::new(BatchWindow::default()),
        }
    }

    /// Adds `key` to the current window and returns a future for its result
    ///
    /// Registration happens synchronously; only waiting is deferred.
    pub fn request_key(
        self: &Arc<Self>,
        key: EntityKey,
    ) -> BoxFuture<'static, Result<E, DomainError>> {
        let (tx, rx) = oneshot::channel();

        let registered = self.lock_window().map(|mut window| {
            window.push(key.clone(), tx);
            self.config
                .max_batch_size
                .is_some_and(|max| window.len() >= max)
        });

        if let Ok(true) = registered {
            self.flush();
        }

        let dispatcher = Arc::clone(self);

        async move {
            registered?;

            for _ in 0..dispatcher.config.yield_count {
                tokio::task::yield_now().await;
            }

            dispatcher.flush();

            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::internal(format!(
                    "Batch for '{}' ended without delivering a result",
                    key
                ))),
            }
        }
        .boxed()
    }

    /// Number of keys waiting in the current window
    pub fn pending_keys(&self) -> usize {
        self.lock_window().map(|w| w.len()).unwrap_or(0)
    }

    /// Closes the current window and dispatches it, if it holds any keys
    pub fn flush(self: &Arc<Self>) {
        let window = match self.lock_window() {
            Ok(mut window) if !window.is_empty() => std::mem::take(&mut *window),
            Ok(_) => return,
            Err(e) => {
                warn!(kind = %E::KIND, error = %e, "Batch window unavailable");
                return;
            }
        };

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(window).await });
    }

    async fn dispatch(&self, window: BatchWindow<E>) {
        let BatchWindow { keys, mut waiters } = window;
        let size = keys.len();

        debug!(kind = %E::KIND, batch_size = size, "Dispatching batch");
        self.stats.record_batch(size);
        observability::record_batch(E::KIND, size);

        match self.run_batch(&keys).await {
            Ok(results) if results.len() == size => {
                for (key, result) in keys.iter().zip(results) {
                    deliver(&mut waiters, key, result);
                }
            }
            Ok(results) => {
                let error = DomainError::internal(format!(
                    "Batch function returned {} results for {} keys",
                    results.len(),
                    size
                ));
                warn!(kind = %E::KIND, batch_size = size, error = %error, "Malformed batch result");
                self.fail_all(&keys, &mut waiters, error, "length_mismatch");
            }
            Err(error) => {
                warn!(kind = %E::KIND, batch_size = size, error = %error, "Batch failed");
                let reason = if error.is_cancelled() {
                    "cancelled"
                } else {
                    "fetch_error"
                };
                self.fail_all(&keys, &mut waiters, error, reason);
            }
        }
    }

    async fn run_batch(&self, keys: &[EntityKey]) -> BatchOutcome<E> {
        let ctx = FetchContext::new(self.cancellation.clone());

        let fetch = async {
            match self.config.batch_timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.fetcher.fetch_batch(&ctx, keys))
                    .await
                    .unwrap_or_else(|_| {
                        Err(DomainError::cancelled(format!(
                            "batch timed out after {:?}",
                            timeout
                        )))
                    }),
                None => self.fetcher.fetch_batch(&ctx, keys).await,
            }
        };

        tokio::select! {
            biased;
            reason = self.cancellation.cancelled() => Err(DomainError::cancelled(reason)),
            outcome = fetch => outcome,
        }
    }

    fn fail_all(
        &self,
        keys: &[EntityKey],
        waiters: &mut HashMap<EntityKey, Vec<Waiter<E>>>,
        error: DomainError,
        reason: &'static str,
    ) {
        self.stats.record_batch_failure();
        observability::record_batch_failure(E::KIND, reason);

        for key in keys {
            deliver(waiters, key, Err(error.clone()));
        }
    }

    fn lock_window(&self) -> Result<MutexGuard<'_, BatchWindow<E>>, DomainError> {
        self.window.lock().map_err(|e| {
            DomainError::internal(format!("Failed to acquire batch window lock: {}", e))
        })
    }
}

impl<E: Entity> std::fmt::Debug for BatchDispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("kind", &E::KIND)
            .field("config", &self.config)
            .field("pending_keys", &self.pending_keys())
            .finish()
    }
}

fn deliver<E: Clone>(
    waiters: &mut HashMap<EntityKey, Vec<Waiter<E>>>,
    key: &EntityKey,
    result: Result<E, DomainError>,
) {
    let Some(senders) = waiters.remove(key) else {
        return;
    };

    for sender in senders {
        // A dropped receiver only means that caller stopped waiting.
        let _ = sender.send(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Film;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Records every batch it receives
    #[derive(Default)]
    struct RecordingBatchFetch {
        batches: Mutex<Vec<Vec<EntityKey>>>,
        fail_batch: Option<DomainError>,
        truncate: bool,
        delay: Option<Duration>,
    }

    impl RecordingBatchFetch {
        fn batches(&self) -> Vec<Vec<EntityKey>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchFetch<Film> for RecordingBatchFetch {
        async fn fetch_batch(&self, _ctx: &FetchContext, keys: &[EntityKey]) -> BatchOutcome<Film> {
            self.batches.lock().unwrap().push(keys.to_vec());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(error) = &self.fail_batch {
                return Err(error.clone());
            }

            let mut results: Vec<_> = keys
                .iter()
                .map(|k| {
                    if k.as_str().ends_with("missing") {
                        Err(DomainError::not_found(k.as_str()))
                    } else {
                        Ok(Film::new(k.as_str(), format!("Film {}", k)))
                    }
                })
                .collect();

            if self.truncate {
                results.pop();
            }

            Ok(results)
        }
    }

    fn dispatcher(
        fetcher: Arc<RecordingBatchFetch>,
        config: LoaderConfig,
    ) -> (Arc<BatchDispatcher<Film>>, CancellationSignal) {
        let cancellation = CancellationSignal::new();
        let dispatcher = Arc::new(BatchDispatcher::new(
            fetcher,
            config,
            cancellation.clone(),
            Arc::new(LoaderStats::new()),
        ));
        (dispatcher, cancellation)
    }

    #[tokio::test]
    async fn test_requests_issued_together_share_one_batch() {
        let fetcher = Arc::new(RecordingBatchFetch::default());
        let (dispatcher, _) = dispatcher(fetcher.clone(), LoaderConfig::default());

        let a = dispatcher.request_key(EntityKey::from("a"));
        let b = dispatcher.request_key(EntityKey::from("b"));
        let c = dispatcher.request_key(EntityKey::from("c"));
        assert_eq!(dispatcher.pending_keys(), 3);

        let (a, b, c) = tokio::join!(a, b, c);
        assert_eq!(a.unwrap().url, "a");
        assert_eq!(b.unwrap().url, "b");
        assert_eq!(c.unwrap().url, "c");

        let batches = fetcher.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], EntityKey::from_strings(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_duplicate_requests_are_sent_once() {
        let fetcher = Arc::new(RecordingBatchFetch::default());
        let (dispatcher, _) = dispatcher(fetcher.clone(), LoaderConfig::default());

        let first = dispatcher.request_key(EntityKey::from("a"));
        let second = dispatcher.request_key(EntityKey::from("a"));

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(fetcher.batches(), vec![EntityKey::from_strings(["a"])]);
    }

    #[tokio::test]
    async fn test_per_key_failure_does_not_fail_siblings() {
        let fetcher = Arc::new(RecordingBatchFetch::default());
        let (dispatcher, _) = dispatcher(fetcher, LoaderConfig::default());

        let ok = dispatcher.request_key(EntityKey::from("a"));
        let missing = dispatcher.request_key(EntityKey::from("b-missing"));

        let (ok, missing) = tokio::join!(ok, missing);
        assert!(ok.is_ok());
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_batch_error_fans_out_to_every_key() {
        let fetcher = Arc::new(RecordingBatchFetch {
            fail_batch: Some(DomainError::remote_fetch("*", "upstream down")),
            ..Default::default()
        });
        let (dispatcher, _) = dispatcher(fetcher, LoaderConfig::default());

        let a = dispatcher.request_key(EntityKey::from("a"));
        let b = dispatcher.request_key(EntityKey::from("b"));

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap_err(), DomainError::remote_fetch("*", "upstream down"));
        assert_eq!(b.unwrap_err(), DomainError::remote_fetch("*", "upstream down"));
    }

    #[tokio::test]
    async fn test_result_length_mismatch_fails_batch() {
        let fetcher = Arc::new(RecordingBatchFetch {
            truncate: true,
            ..Default::default()
        });
        let (dispatcher, _) = dispatcher(fetcher, LoaderConfig::default());

        let a = dispatcher.request_key(EntityKey::from("a"));
        let b = dispatcher.request_key(EntityKey::from("b"));

        let (a, b) = tokio::join!(a, b);
        assert!(matches!(a.unwrap_err(), DomainError::Internal { .. }));
        assert!(matches!(b.unwrap_err(), DomainError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_max_batch_size_splits_windows() {
        let fetcher = Arc::new(RecordingBatchFetch::default());
        let config = LoaderConfig::default().with_max_batch_size(2);
        let (dispatcher, _) = dispatcher(fetcher.clone(), config);

        let requests: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|k| dispatcher.request_key(EntityKey::from(k)))
            .collect();

        let results = futures::future::join_all(requests).await;
        assert!(results.iter().all(Result::is_ok));

        let mut sizes: Vec<usize> = fetcher.batches().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_cancellation_fails_in_flight_batch() {
        let fetcher = Arc::new(RecordingBatchFetch {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let (dispatcher, cancellation) = dispatcher(fetcher, LoaderConfig::default());

        let x = dispatcher.request_key(EntityKey::from("x"));
        let y = dispatcher.request_key(EntityKey::from("y"));

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancellation.cancel("request aborted");
        };

        let (x, y, _) = tokio::join!(x, y, cancel);
        assert_eq!(x.unwrap_err(), DomainError::cancelled("request aborted"));
        assert_eq!(y.unwrap_err(), DomainError::cancelled("request aborted"));
    }

    #[tokio::test]
    async fn test_already_cancelled_scope_never_fetches() {
        let fetcher = Arc::new(RecordingBatchFetch::default());
        let (dispatcher, cancellation) = dispatcher(fetcher.clone(), LoaderConfig::default());
        cancellation.cancel("gone");

        let result = dispatcher.request_key(EntityKey::from("a")).await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(fetcher.batches().is_empty());
    }

    #[tokio::test]
    async fn test_batch_timeout_reports_cancellation() {
        let fetcher = Arc::new(RecordingBatchFetch {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let config = LoaderConfig::default().with_batch_timeout(Duration::from_millis(10));
        let (dispatcher, _) = dispatcher(fetcher, config);

        let result = dispatcher.request_key(EntityKey::from("slow")).await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_strand_siblings() {
        let fetcher = Arc::new(RecordingBatchFetch {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let (dispatcher, _) = dispatcher(fetcher, LoaderConfig::default());

        let abandoned = dispatcher.request_key(EntityKey::from("a"));
        let kept = dispatcher.request_key(EntityKey::from("b"));

        // Poll the first waiter far enough to flush the window, then drop it.
        let _ = tokio::time::timeout(Duration::from_millis(5), abandoned).await;

        assert_eq!(kept.await.unwrap().url, "b");
    }
}
