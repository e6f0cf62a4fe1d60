//! SWAPI entity shapes and the trait tying them to the loader

mod film;
mod page;
mod person;
mod planet;

use std::fmt::{self, Debug};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DomainError, EntityKey};

pub use film::Film;
pub use page::Page;
pub use person::Person;
pub use planet::Planet;

/// Kinds of entity a scope can hold a loader for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Film,
    Person,
    Planet,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Person => "person",
            Self::Planet => "planet",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "film" | "films" => Ok(Self::Film),
            "person" | "people" => Ok(Self::Person),
            "planet" | "planets" => Ok(Self::Planet),
            other => Err(DomainError::configuration(format!(
                "Unknown entity kind '{}'",
                other
            ))),
        }
    }
}

/// A value the loader can fetch, cache and prime
///
/// Implementors are immutable snapshots of a remote resource and know the
/// canonical URL they were fetched from.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Kind used to look the loader up in a scope
    const KIND: EntityKind;

    /// Canonical key this entity is cached under
    fn key(&self) -> EntityKey;
}
