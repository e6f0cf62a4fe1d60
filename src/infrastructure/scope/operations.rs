//! Loader operations addressed by scope
//!
//! These are what resolver code calls: every operation names the scope it
//! runs in and the entity type it expects.

use std::sync::Arc;

use super::RequestScope;
use crate::domain::{DomainError, Entity, EntityKey, LoadResults, Page};
use crate::infrastructure::loader::Loader;

/// Looks up the scope's loader for `E`
pub fn extract_loader<E: Entity>(scope: &RequestScope) -> Result<Arc<Loader<E>>, DomainError> {
    scope.loader::<E>()
}

/// Loads one entity through the scope's loader
pub async fn load_one<E: Entity>(
    scope: &RequestScope,
    key: impl Into<EntityKey>,
) -> Result<E, DomainError> {
    let loader = scope.loader::<E>()?;
    loader.load_one(key).await
}

/// Loads several entities through the scope's loader
///
/// Only a missing or mismatched loader fails the whole call; per-key
/// failures are reported in the returned collection.
pub async fn load_many<E, I>(scope: &RequestScope, keys: I) -> Result<LoadResults<E>, DomainError>
where
    E: Entity,
    I: IntoIterator,
    I::Item: Into<EntityKey>,
{
    let loader = scope.loader::<E>()?;
    Ok(loader.load_many(keys).await)
}

/// Primes the scope's cache with entities already at hand
pub fn prime<E, I>(scope: &RequestScope, entities: I) -> Result<usize, DomainError>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    scope.loader::<E>()?.prime(entities)
}

/// Primes the scope's cache with every entity of a list page
pub fn prime_page<E: Entity>(scope: &RequestScope, page: &Page<E>) -> Result<usize, DomainError> {
    scope.loader::<E>()?.prime_page(page)
}
