use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::domain::EntityKey;

/// A Star Wars planet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    #[serde(default)]
    pub rotation_period: String,
    #[serde(default)]
    pub orbital_period: String,
    #[serde(default)]
    pub diameter: String,
    #[serde(default)]
    pub climate: String,
    #[serde(default)]
    pub gravity: String,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub surface_water: String,
    #[serde(default)]
    pub population: String,
    /// Person URLs
    #[serde(default)]
    pub residents: Vec<String>,
    /// Film URLs
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
}

impl Planet {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Planet {
    const KIND: EntityKind = EntityKind::Planet;

    fn key(&self) -> EntityKey {
        EntityKey::from(&self.url)
    }
}
