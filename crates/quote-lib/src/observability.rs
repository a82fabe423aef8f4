//! Observability for the quote engine
//!
//! Provides:
//! - Prometheus metrics (lookup latency, widening and no-match counts, leveling latency)
//! - Structured logging of lookup and leveling outcomes with tracing

use crate::models::{OptimizerMode, ResourceKind};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    lookup_latency_seconds: Histogram,
    lookups: IntCounter,
    lookups_widened: IntCounter,
    lookups_no_match: IntCounter,
    leveling_latency_seconds: Histogram,
    committed_resources: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            lookup_latency_seconds: register_histogram!(
                "quote_engine_lookup_latency_seconds",
                "Time spent finding the best catalog offer for one resource",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register lookup_latency_seconds"),

            lookups: register_int_counter!(
                "quote_engine_lookups_total",
                "Total number of resource lookups"
            )
            .expect("Failed to register lookups"),

            lookups_widened: register_int_counter!(
                "quote_engine_lookups_widened_total",
                "Lookups that needed the wide pass"
            )
            .expect("Failed to register lookups_widened"),

            lookups_no_match: register_int_counter!(
                "quote_engine_lookups_no_match_total",
                "Lookups without any matching offer"
            )
            .expect("Failed to register lookups_no_match"),

            leveling_latency_seconds: register_histogram!(
                "quote_engine_leveling_latency_seconds",
                "Time spent leveling one budget group",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register leveling_latency_seconds"),

            committed_resources: register_int_gauge!(
                "quote_engine_committed_resources",
                "Resources on a committed term after the last leveling pass"
            )
            .expect("Failed to register committed_resources"),
        }
    }
}

/// Handle to the process-wide engine metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_lookup(&self, duration_secs: f64, widened: bool) {
        let inner = self.inner();
        inner.lookup_latency_seconds.observe(duration_secs);
        inner.lookups.inc();
        if widened {
            inner.lookups_widened.inc();
        }
    }

    pub fn inc_no_match(&self) {
        self.inner().lookups.inc();
        self.inner().lookups_no_match.inc();
    }

    pub fn observe_leveling(&self, duration_secs: f64, committed: usize) {
        self.inner().leveling_latency_seconds.observe(duration_secs);
        self.inner().committed_resources.set(committed as i64);
    }

    pub fn lookups_total(&self) -> u64 {
        self.inner().lookups.get()
    }
}

/// Structured logger for engine events
#[derive(Clone)]
pub struct QuoteLogger {
    quote: String,
}

impl QuoteLogger {
    pub fn new(quote: impl Into<String>) -> Self {
        Self {
            quote: quote.into(),
        }
    }

    pub fn log_lookup(
        &self,
        kind: ResourceKind,
        resource: &str,
        price: &str,
        monthly_cost: f64,
        co2: f64,
        optimizer: OptimizerMode,
    ) {
        info!(
            event = "lookup_completed",
            quote = %self.quote,
            kind = %kind,
            resource = %resource,
            price = %price,
            monthly_cost = monthly_cost,
            co2 = co2,
            optimizer = ?optimizer,
            "Selected catalog offer"
        );
    }

    pub fn log_no_match(&self, kind: ResourceKind, resource: &str, location: &str) {
        warn!(
            event = "lookup_no_match",
            quote = %self.quote,
            kind = %kind,
            resource = %resource,
            location = %location,
            "No catalog offer matches the request"
        );
    }

    pub fn log_widened(&self, kind: ResourceKind, resource: &str) {
        info!(
            event = "lookup_widened",
            quote = %self.quote,
            kind = %kind,
            resource = %resource,
            "Narrow pass found nothing, widened the search"
        );
    }

    pub fn log_optimizer_downgrade(&self, resource: &str, location: &str) {
        warn!(
            event = "optimizer_downgraded",
            quote = %self.quote,
            resource = %resource,
            location = %location,
            "No CO2 data for location, optimizing on cost"
        );
    }

    pub fn log_leveled(
        &self,
        budget: &str,
        capacity: f64,
        remaining: f64,
        committed: usize,
        resources: usize,
    ) {
        info!(
            event = "budget_leveled",
            quote = %self.quote,
            budget = %budget,
            capacity = capacity,
            remaining = remaining,
            committed = committed,
            resources = resources,
            "Budget leveled"
        );
    }

    pub fn log_overcommitted(&self, budget: &str, capacity: f64, demoted: usize) {
        warn!(
            event = "budget_overcommitted",
            quote = %self.quote,
            budget = %budget,
            capacity = capacity,
            demoted = demoted,
            "Budget too small for every committed term, demoted resources"
        );
    }
}
