//! SWAPI Dataloader
//!
//! Per-request batching and deduplication for SWAPI entities:
//! - Concurrent requests for the same key share one fetch
//! - Keys requested in the same window are fetched as one batch
//! - Resolved entities are cached for the lifetime of a request scope
//! - Entities already at hand (e.g. from a list page) can be primed

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    BatchFetch, CancellationSignal, DomainError, Entity, EntityFetcher, EntityKey, EntityKind,
    FetchContext, Film, LoadResults, Page, Person, Planet,
};
pub use infrastructure::loader::{Loader, LoaderConfig};
pub use infrastructure::scope::{
    extract_loader, load_many, load_one, prime, prime_page, LoaderRegistry, RequestScope,
};
