use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::domain::EntityKey;

/// A Star Wars character
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub mass: String,
    #[serde(default)]
    pub hair_color: String,
    #[serde(default)]
    pub skin_color: String,
    #[serde(default)]
    pub eye_color: String,
    #[serde(default)]
    pub birth_year: String,
    #[serde(default)]
    pub gender: String,
    /// Planet URL
    #[serde(default)]
    pub homeworld: String,
    /// Film URLs
    #[serde(default)]
    pub films: Vec<String>,
    pub url: String,
}

impl Person {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_homeworld(mut self, homeworld: impl Into<String>) -> Self {
        self.homeworld = homeworld.into();
        self
    }
}

impl Entity for Person {
    const KIND: EntityKind = EntityKind::Person;

    fn key(&self) -> EntityKey {
        EntityKey::from(&self.url)
    }
}
