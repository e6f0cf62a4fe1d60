use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::domain::EntityKey;

/// A Star Wars film
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub title: String,
    #[serde(default)]
    pub episode_id: u32,
    #[serde(default)]
    pub opening_crawl: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub release_date: String,
    /// Person URLs
    #[serde(default)]
    pub characters: Vec<String>,
    /// Planet URLs
    #[serde(default)]
    pub planets: Vec<String>,
    pub url: String,
}

impl Film {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characters = characters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_planets<I, S>(mut self, planets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.planets = planets.into_iter().map(Into::into).collect();
        self
    }
}

impl Entity for Film {
    const KIND: EntityKind = EntityKind::Film;

    fn key(&self) -> EntityKey {
        EntityKey::from(&self.url)
    }
}
