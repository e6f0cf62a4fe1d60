//! Observability infrastructure - Loader metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    init_metrics, record_batch, record_batch_failure, record_cache_hit, record_primed,
    PrometheusMetrics,
};
