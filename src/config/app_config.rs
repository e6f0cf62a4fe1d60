use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::loader::LoaderConfig;
use crate::infrastructure::observability::MetricsConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub scope: ScopeSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Batching behaviour of every loader
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSettings {
    #[serde(default = "default_yield_count")]
    pub yield_count: usize,
    #[serde(default)]
    pub max_batch_size: Option<usize>,
    #[serde(default)]
    pub batch_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeSettings {
    /// Cancel a request scope this long after it starts
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_yield_count() -> usize {
    1
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            yield_count: default_yield_count(),
            max_batch_size: None,
            batch_timeout_ms: None,
        }
    }
}

impl LoaderSettings {
    pub fn loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::default().with_yield_count(self.yield_count);

        if let Some(max) = self.max_batch_size {
            config = config.with_max_batch_size(max);
        }

        if let Some(ms) = self.batch_timeout_ms {
            config = config.with_batch_timeout(Duration::from_millis(ms));
        }

        config
    }
}

impl ScopeSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
