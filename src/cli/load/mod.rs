//! Load command - resolves keys through one request scope

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{DomainError, Entity, EntityKey, EntityKind, Film, Person, Planet};
use crate::infrastructure::loader::LoaderStatsSnapshot;
use crate::infrastructure::logging;
use crate::infrastructure::observability::init_metrics;
use crate::infrastructure::scope::{extract_loader, load_many, prime, LoaderRegistry, RequestScope};
use crate::infrastructure::source::Fixtures;

/// Arguments for the load command
#[derive(Args, Clone, Debug)]
pub struct LoadArgs {
    /// JSON fixture file with `films`, `people` and `planets` arrays
    #[arg(long)]
    pub fixtures: PathBuf,

    /// Entity kind of the requested keys
    #[arg(long, default_value = "film")]
    pub kind: EntityKind,

    /// Entity URLs to load; duplicates are allowed
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Prime the scope with every fixture of the kind before loading
    #[arg(long)]
    pub prime: bool,

    /// Simulated latency of each remote fetch
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Print Prometheus metrics after the report
    #[arg(long)]
    pub metrics: bool,
}

/// What one scope did for the requested keys
#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub scope: Uuid,
    pub kind: EntityKind,
    pub primed: usize,
    pub results: Vec<KeyOutcome>,
    pub stats: LoaderStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct KeyOutcome {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the load command
pub async fn run(args: LoadArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&logging::LoggingConfig {
        level: config.logging.level.clone(),
        format: config.logging.format.clone(),
    });

    let mut metrics_config = config.metrics.clone();
    metrics_config.enabled |= args.metrics;
    let metrics = init_metrics(&metrics_config);

    let fixtures = Fixtures::load(&args.fixtures).await?;
    let latency = args.latency_ms.map(Duration::from_millis);
    let registry = build_registry(&fixtures, &config, latency);

    let scope = registry.new_scope();
    info!(scope = %scope.id(), kind = %args.kind, keys = args.keys.len(), "Loading entities");

    let report = match args.kind {
        EntityKind::Film => load_kind(&scope, fixtures.films, &args).await?,
        EntityKind::Person => load_kind(&scope, fixtures.people, &args).await?,
        EntityKind::Planet => load_kind(&scope, fixtures.planets, &args).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(metrics) = metrics {
        println!("{}", metrics.render());
    }

    Ok(())
}

/// Registry serving every kind from the fixture file
pub fn build_registry(
    fixtures: &Fixtures,
    config: &AppConfig,
    latency: Option<Duration>,
) -> LoaderRegistry {
    let mut builder = LoaderRegistry::builder()
        .with_config(config.loader.loader_config())
        .register::<Film>(Arc::new(fixtures.film_source(latency)))
        .register::<Person>(Arc::new(fixtures.person_source(latency)))
        .register::<Planet>(Arc::new(fixtures.planet_source(latency)));

    if let Some(timeout) = config.scope.timeout() {
        builder = builder.with_scope_timeout(timeout);
    }

    builder.build()
}

async fn load_kind<E>(
    scope: &RequestScope,
    known: Vec<E>,
    args: &LoadArgs,
) -> Result<LoadReport, DomainError>
where
    E: Entity + Serialize,
{
    let primed = if args.prime {
        prime::<E, _>(scope, known)?
    } else {
        0
    };

    let results = load_many::<E, _>(scope, args.keys.iter().map(EntityKey::from)).await?;

    let outcomes = args
        .keys
        .iter()
        .zip(results.iter())
        .map(|(key, result)| outcome(key, result))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadReport {
        scope: scope.id(),
        kind: E::KIND,
        primed,
        results: outcomes,
        stats: extract_loader::<E>(scope)?.stats(),
    })
}

fn outcome<E: Serialize>(
    key: &str,
    result: &Result<E, DomainError>,
) -> Result<KeyOutcome, DomainError> {
    match result {
        Ok(entity) => {
            let entity = serde_json::to_value(entity).map_err(|e| {
                DomainError::internal(format!("Failed to serialize entity {}: {}", key, e))
            })?;

            Ok(KeyOutcome {
                key: key.to_string(),
                entity: Some(entity),
                error: None,
            })
        }
        Err(e) => Ok(KeyOutcome {
            key: key.to_string(),
            entity: None,
            error: Some(e.to_string()),
        }),
    }
}
