//! Process-wide loader registry that mints request scopes

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::RequestScope;
use crate::domain::{BatchFetch, Entity, EntityFetcher, EntityKind};
use crate::infrastructure::loader::{
    CancellationSignal, ConcurrentBatchFetch, Loader, LoaderConfig,
};

/// Creates the loader for one entity kind inside a scope
pub(crate) trait LoaderFactory: Send + Sync {
    fn create(
        &self,
        config: &LoaderConfig,
        cancellation: &CancellationSignal,
    ) -> Arc<dyn Any + Send + Sync>;

    /// Discards the cache of a loader this factory created
    fn discard(&self, loader: &Arc<dyn Any + Send + Sync>);

    /// Short name of the entity type the created loader serves
    fn entity_type(&self) -> &'static str;
}

struct TypedLoaderFactory<E: Entity> {
    fetcher: Arc<dyn BatchFetch<E>>,
}

impl<E: Entity> LoaderFactory for TypedLoaderFactory<E> {
    fn create(
        &self,
        config: &LoaderConfig,
        cancellation: &CancellationSignal,
    ) -> Arc<dyn Any + Send + Sync> {
        Arc::new(Loader::new(
            Arc::clone(&self.fetcher),
            config.clone(),
            cancellation.clone(),
        ))
    }

    fn discard(&self, loader: &Arc<dyn Any + Send + Sync>) {
        if let Some(loader) = loader.downcast_ref::<Loader<E>>() {
            loader.discard();
        }
    }

    fn entity_type(&self) -> &'static str {
        short_type_name::<E>()
    }
}

pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Fetch capabilities and loader settings shared by every request
///
/// The registry holds no per-request state; each call to
/// [`LoaderRegistry::new_scope`] returns a scope with empty caches.
#[derive(Clone)]
pub struct LoaderRegistry {
    factories: Arc<HashMap<EntityKind, Arc<dyn LoaderFactory>>>,
    config: LoaderConfig,
    scope_timeout: Option<Duration>,
}

impl LoaderRegistry {
    pub fn builder() -> LoaderRegistryBuilder {
        LoaderRegistryBuilder::default()
    }

    /// Starts a new request scope
    pub fn new_scope(&self) -> RequestScope {
        let scope = RequestScope::new(
            self.factories.as_ref().clone(),
            self.config.clone(),
            CancellationSignal::new(),
        );

        if let Some(timeout) = self.scope_timeout {
            scope.arm_deadline(timeout);
        }

        scope
    }

    /// Entity kinds with a registered fetch capability
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.factories.keys().copied().collect()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("kinds", &self.kinds())
            .field("config", &self.config)
            .field("scope_timeout", &self.scope_timeout)
            .finish()
    }
}

/// Builder for [`LoaderRegistry`]
#[derive(Default)]
pub struct LoaderRegistryBuilder {
    factories: HashMap<EntityKind, Arc<dyn LoaderFactory>>,
    config: LoaderConfig,
    scope_timeout: Option<Duration>,
}

impl LoaderRegistryBuilder {
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancels every scope this long after it was created
    pub fn with_scope_timeout(mut self, timeout: Duration) -> Self {
        self.scope_timeout = Some(timeout);
        self
    }

    /// Registers a per-key fetcher; batches fan out one task per key
    pub fn register<E: Entity>(self, fetcher: Arc<dyn EntityFetcher<E>>) -> Self {
        self.register_batch::<E>(Arc::new(ConcurrentBatchFetch::new(fetcher)))
    }

    /// Registers a fetcher that handles whole batches itself
    pub fn register_batch<E: Entity>(self, fetcher: Arc<dyn BatchFetch<E>>) -> Self {
        self.register_for_kind::<E>(E::KIND, fetcher)
    }

    /// Registers a batch fetcher under an explicit kind
    ///
    /// Extracting a loader for `kind` with any type other than `E` fails with
    /// a wrong type error.
    pub fn register_for_kind<E: Entity>(
        mut self,
        kind: EntityKind,
        fetcher: Arc<dyn BatchFetch<E>>,
    ) -> Self {
        let factory: Arc<dyn LoaderFactory> = Arc::new(TypedLoaderFactory { fetcher });

        if self.factories.insert(kind, factory).is_some() {
            warn!(kind = %kind, "Replacing previously registered loader");
        }

        self
    }

    pub fn build(self) -> LoaderRegistry {
        LoaderRegistry {
            factories: Arc::new(self.factories),
            config: self.config,
            scope_timeout: self.scope_timeout,
        }
    }
}
