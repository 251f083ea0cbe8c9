//! Metrics collection for observability

use crate::context::models::{Tier, UsageStats};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics collector
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// What one optimization pass observed
#[derive(Debug, Clone, Copy)]
pub struct PassObservation {
    pub tier: Tier,
    pub stats: UsageStats,
    pub over_budget: bool,
    pub truncated_sources: usize,
    pub skipped_sources: usize,
    pub pruned_lessons: usize,
    pub pruned_decisions: usize,
}

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Optimization passes
    pub optimization_passes: CounterVec,

    // Token budget metrics
    pub token_budget_used: Histogram,
    pub token_budget_remaining: Histogram,
    pub token_budget_overflows: Counter,

    // Pruning metrics
    pub sources_truncated: Counter,
    pub sources_skipped: Counter,
    pub memory_items_pruned: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let optimization_passes = register_counter_vec_with_registry!(
            Opts::new("context_optimization_passes_total", "Total optimization passes"),
            &["tier"],
            registry
        )?;

        let token_budget_used = register_histogram_with_registry!(
            "context_token_budget_used",
            "Tokens used per optimization pass",
            vec![100.0, 250.0, 500.0, 1000.0, 2000.0, 3000.0, 4000.0, 6000.0, 8000.0, 12000.0],
            registry
        )?;

        let token_budget_remaining = register_histogram_with_registry!(
            "context_token_budget_remaining",
            "Tokens remaining per optimization pass",
            vec![0.0, 500.0, 1000.0, 2000.0, 4000.0, 6000.0, 8000.0],
            registry
        )?;

        let token_budget_overflows = register_counter_with_registry!(
            Opts::new("context_token_budget_overflows_total", "Passes that exceeded the global budget"),
            registry
        )?;

        let sources_truncated = register_counter_with_registry!(
            Opts::new("context_sources_truncated_total", "Sources pruned to fit a tier ceiling"),
            registry
        )?;

        let sources_skipped = register_counter_with_registry!(
            Opts::new("context_sources_skipped_total", "Sources skipped because they were unreadable"),
            registry
        )?;

        let memory_items_pruned = register_counter_vec_with_registry!(
            Opts::new("context_memory_items_pruned_total", "Memory items removed by pruning"),
            &["collection"],
            registry
        )?;

        Ok(Self {
            registry,
            optimization_passes,
            token_budget_used,
            token_budget_remaining,
            token_budget_overflows,
            sources_truncated,
            sources_skipped,
            memory_items_pruned,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record token budget usage
    pub fn record_token_budget(&self, used: usize, remaining: usize, overflow: bool) {
        self.token_budget_used.observe(used as f64);
        self.token_budget_remaining.observe(remaining as f64);
        if overflow {
            self.token_budget_overflows.inc();
        }
    }

    /// Record a completed optimization pass
    pub fn record_pass(&self, pass: &PassObservation) {
        self.optimization_passes
            .with_label_values(&[pass.tier.as_str()])
            .inc();
        self.record_token_budget(pass.stats.used, pass.stats.remaining, pass.over_budget);
        self.sources_truncated.inc_by(pass.truncated_sources as f64);
        self.sources_skipped.inc_by(pass.skipped_sources as f64);
        self.memory_items_pruned
            .with_label_values(&["lessons"])
            .inc_by(pass.pruned_lessons as f64);
        self.memory_items_pruned
            .with_label_values(&["decisions"])
            .inc_by(pass.pruned_decisions as f64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_default()
    }
}
