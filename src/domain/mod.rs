//! Domain layer - Entities, keys, errors and the fetch capabilities

pub mod cancellation;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod result;

pub use cancellation::CancellationSignal;
pub use entity::{Entity, EntityKind, Film, Page, Person, Planet};
pub use error::DomainError;
pub use fetcher::{BatchFetch, BatchOutcome, EntityFetcher, FetchContext};
pub use key::EntityKey;
pub use result::LoadResults;

#[cfg(test)]
pub use fetcher::MockEntityFetcher;
