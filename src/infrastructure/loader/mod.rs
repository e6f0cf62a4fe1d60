//! Per-request batching and deduplication loader
//!
//! ```text
//! Loader::load_one ──> ScopedCache::get_or_create ──> BatchDispatcher::request_key
//!                                                           │ (window flush)
//!                                                           v
//!                              ConcurrentBatchFetch ──> EntityFetcher (one task per key)
//! ```

mod cache;
mod config;
mod dispatcher;
mod facade;
mod fan_out;
mod stats;

pub use crate::domain::CancellationSignal;
pub use cache::{CacheEntry, EntryState, PendingValue, ScopedCache};
pub use config::LoaderConfig;
pub use dispatcher::BatchDispatcher;
pub use facade::Loader;
pub use fan_out::ConcurrentBatchFetch;
pub use stats::{LoaderStats, LoaderStatsSnapshot};
