//! JSON fixture files for the in-memory source

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::InMemoryEntitySource;
use crate::domain::{DomainError, Entity, Film, Person, Planet};

/// Entity snapshots grouped by kind, as stored in a fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub films: Vec<Film>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub planets: Vec<Planet>,
}

impl Fixtures {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid fixture file: {}", e)))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read fixture file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&json)
    }

    pub fn film_source(&self, latency: Option<Duration>) -> InMemoryEntitySource<Film> {
        source(self.films.clone(), latency)
    }

    pub fn person_source(&self, latency: Option<Duration>) -> InMemoryEntitySource<Person> {
        source(self.people.clone(), latency)
    }

    pub fn planet_source(&self, latency: Option<Duration>) -> InMemoryEntitySource<Planet> {
        source(self.planets.clone(), latency)
    }
}

fn source<E: Entity>(entities: Vec<E>, latency: Option<Duration>) -> InMemoryEntitySource<E> {
    let source = InMemoryEntitySource::with_entities(entities);

    match latency {
        Some(latency) => source.with_latency(latency),
        None => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityFetcher, EntityKey, FetchContext};

    const FIXTURES: &str = r#"{
        "films": [
            {
                "title": "A New Hope",
                "episode_id": 4,
                "characters": ["https://swapi.dev/api/people/1/"],
                "url": "https://swapi.dev/api/films/1/"
            }
        ],
        "people": [
            {"name": "Luke Skywalker", "homeworld": "https://swapi.dev/api/planets/1/", "url": "https://swapi.dev/api/people/1/"}
        ]
    }"#;

    #[test]
    fn test_parse_fixtures() {
        let fixtures = Fixtures::from_json(FIXTURES).unwrap();
        assert_eq!(fixtures.films.len(), 1);
        assert_eq!(fixtures.films[0].episode_id, 4);
        assert_eq!(fixtures.people.len(), 1);
        assert!(fixtures.planets.is_empty());
    }

    #[test]
    fn test_invalid_fixtures() {
        let err = Fixtures::from_json("{ not json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_sources_serve_fixture_entities() {
        let fixtures = Fixtures::from_json(FIXTURES).unwrap();
        let people = fixtures.person_source(None);

        let luke = people
            .fetch(
                &FetchContext::default(),
                &EntityKey::from("https://swapi.dev/api/people/1/"),
            )
            .await
            .unwrap();
        assert_eq!(luke.homeworld, "https://swapi.dev/api/planets/1/");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Fixtures::load("/definitely/not/here.json").await.unwrap_err();
        assert!(err.is_configuration());
    }
}
