//! Prometheus metrics for the batching loader
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::sync::Arc;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::EntityKind;

/// Prometheus metrics handle used to render the collected metrics
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Renders the metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::debug!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("dataloader_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics recorder installed");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Record one dispatched batch and its size
pub fn record_batch(kind: EntityKind, size: usize) {
    let labels = [("kind", kind.as_str())];

    counter!("dataloader_batches_total", &labels).increment(1);
    counter!("dataloader_keys_fetched_total", &labels).increment(size as u64);
    histogram!("dataloader_batch_size", &labels).record(size as f64);
}

/// Record a batch that failed as a whole
pub fn record_batch_failure(kind: EntityKind, reason: &'static str) {
    let labels = [("kind", kind.as_str()), ("reason", reason)];
    counter!("dataloader_batch_failures_total", &labels).increment(1);
}

/// Record a load served from the scope cache
pub fn record_cache_hit(kind: EntityKind) {
    counter!("dataloader_cache_hits_total", "kind" => kind.as_str()).increment(1);
}

/// Record entities inserted by priming
pub fn record_primed(kind: EntityKind, count: usize) {
    counter!("dataloader_primed_total", "kind" => kind.as_str()).increment(count as u64);
}
