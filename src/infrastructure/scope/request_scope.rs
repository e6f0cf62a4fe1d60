//! One logical request and the loaders that live inside it

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::registry::{short_type_name, LoaderFactory};
use crate::domain::{DomainError, Entity, EntityKind};
use crate::infrastructure::loader::{CancellationSignal, Loader, LoaderConfig};

struct LoaderSlot {
    factory: Arc<dyn LoaderFactory>,
    loader: OnceLock<Arc<dyn Any + Send + Sync>>,
}

/// Lifetime boundary for cached entities
///
/// Holds at most one loader per registered entity kind, created on first
/// use. Dropping the scope cancels any batch still in flight and discards
/// every cached entity with it.
pub struct RequestScope {
    id: Uuid,
    cancellation: CancellationSignal,
    config: LoaderConfig,
    slots: HashMap<EntityKind, LoaderSlot>,
}

impl RequestScope {
    pub(crate) fn new(
        factories: HashMap<EntityKind, Arc<dyn LoaderFactory>>,
        config: LoaderConfig,
        cancellation: CancellationSignal,
    ) -> Self {
        let slots = factories
            .into_iter()
            .map(|(kind, factory)| {
                (
                    kind,
                    LoaderSlot {
                        factory,
                        loader: OnceLock::new(),
                    },
                )
            })
            .collect();

        let scope = Self {
            id: Uuid::new_v4(),
            cancellation,
            config,
            slots,
        };

        debug!(scope_id = %scope.id, "Request scope created");
        scope
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the loader for `E`, creating it on first use
    ///
    /// Fails with a configuration error when no loader was registered for
    /// `E::KIND`, and with a wrong type error when the loader registered
    /// under that kind serves a different entity type. A loader kept past
    /// the scope's end serves nothing; see [`Loader`].
    pub fn loader<E: Entity>(&self) -> Result<Arc<Loader<E>>, DomainError> {
        let slot = self.slots.get(&E::KIND).ok_or_else(|| {
            DomainError::configuration(format!(
                "No loader registered for entity kind '{}'",
                E::KIND
            ))
        })?;

        let loader = slot.loader.get_or_init(|| {
            debug!(scope_id = %self.id, kind = %E::KIND, "Creating loader");
            slot.factory.create(&self.config, &self.cancellation)
        });

        Arc::clone(loader)
            .downcast::<Loader<E>>()
            .map_err(|_| DomainError::wrong_type(short_type_name::<E>(), slot.factory.entity_type()))
    }

    /// True once a loader for `kind` has been created in this scope
    pub fn has_loader(&self, kind: EntityKind) -> bool {
        self.slots
            .get(&kind)
            .is_some_and(|slot| slot.loader.get().is_some())
    }

    /// Cancels the scope; batches in flight fail with a cancellation error
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();

        if self.cancellation.cancel(reason.clone()) {
            debug!(scope_id = %self.id, reason = %reason, "Request scope cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    /// Cancels the scope once `timeout` elapses
    pub(crate) fn arm_deadline(&self, timeout: Duration) {
        let signal = self.cancellation.clone();
        let scope_id = self.id;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(scope_id = %scope_id, "No async runtime available, scope timeout not armed");
            return;
        };

        handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    if signal.cancel(format!("request scope timed out after {:?}", timeout)) {
                        warn!(scope_id = %scope_id, ?timeout, "Request scope timed out");
                    }
                }
                _ = signal.cancelled() => {}
            }
        });
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.cancellation.cancel("request scope dropped");

        for slot in self.slots.values() {
            if let Some(loader) = slot.loader.get() {
                slot.factory.discard(loader);
            }
        }
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("id", &self.id)
            .field("kinds", &self.slots.keys().collect::<Vec<_>>())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
