//! Metrics collection for observability
//!
//! Prometheus metrics for operation processing, registered on a private
//! registry so several dispatchers can live in one process.
//!
//! # Metrics
//!
//! - `operations_preprocessed_total{operation, outcome}` - PreProcess calls
//! - `operations_processed_total{operation, outcome}` - Process calls
//! - `state_merge_values_total` - Merge values emitted by accepted operations
//! - `processor_pool_reused` - Pooled processors handed out again
//! - `operation_process_duration_seconds` - Histogram of Process latencies

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// PreProcess calls by operation and outcome
    pub preprocessed: IntCounterVec,

    /// Process calls by operation and outcome
    pub processed: IntCounterVec,

    /// Merge values emitted
    pub merge_values: IntCounter,

    /// Pool reuses
    pub pool_reused: IntGauge,

    /// Process duration histogram
    pub process_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let preprocessed = IntCounterVec::new(
            Opts::new(
                "operations_preprocessed_total",
                "Total number of pre-processed operations",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(preprocessed.clone()))?;

        let processed = IntCounterVec::new(
            Opts::new(
                "operations_processed_total",
                "Total number of processed operations",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(processed.clone()))?;

        let merge_values = IntCounter::new(
            "state_merge_values_total",
            "Total number of state merge values emitted",
        )?;
        registry.register(Box::new(merge_values.clone()))?;

        let pool_reused = IntGauge::new(
            "processor_pool_reused",
            "Number of pooled processors handed out again",
        )?;
        registry.register(Box::new(pool_reused.clone()))?;

        let process_duration = Histogram::with_opts(
            HistogramOpts::new(
                "operation_process_duration_seconds",
                "Histogram of operation process latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100]),
        )?;
        registry.register(Box::new(process_duration.clone()))?;

        Ok(Self {
            preprocessed,
            processed,
            merge_values,
            pool_reused,
            process_duration,
            registry,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("merge_values", &self.merge_values.get())
            .field("pool_reused", &self.pool_reused.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_registries() {
        // private registries never collide on metric names
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();

        a.merge_values.inc_by(4);
        assert_eq!(a.merge_values.get(), 4);
        assert_eq!(b.merge_values.get(), 0);
    }

    #[test]
    fn test_export() {
        let metrics = Metrics::new().unwrap();
        metrics
            .preprocessed
            .with_label_values(&["currency-register", "accepted"])
            .inc();

        let text = metrics.export();
        assert!(text.contains("operations_preprocessed_total"));
    }
}
