//! Metrics collection for observability
//!
//! Prometheus metrics for the settlement engine, kept on a private registry
//! so several engines can live in one process.
//!
//! # Metrics
//!
//! - `settlement_plans_total` - Per-currency plans computed
//! - `settlement_failures_total` - Computations that returned an error
//! - `settlement_transfers_total` - Transfers emitted across all plans
//! - `settlement_plan_duration_seconds` - Histogram of full computation latency

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Plans computed
    pub plans_total: IntCounter,

    /// Failed computations
    pub failures_total: IntCounter,

    /// Transfers emitted
    pub transfers_total: IntCounter,

    /// Computation duration histogram
    pub plan_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let plans_total =
            IntCounter::new("settlement_plans_total", "Per-currency plans computed")?;
        registry.register(Box::new(plans_total.clone()))?;

        let failures_total = IntCounter::new(
            "settlement_failures_total",
            "Computations that returned an error",
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let transfers_total = IntCounter::new(
            "settlement_transfers_total",
            "Transfers emitted across all plans",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let plan_duration = Histogram::with_opts(
            HistogramOpts::new(
                "settlement_plan_duration_seconds",
                "Histogram of settlement computation latency",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(plan_duration.clone()))?;

        Ok(Self {
            plans_total,
            failures_total,
            transfers_total,
            plan_duration,
            registry,
        })
    }

    /// Record one successful computation
    pub fn record_success(&self, plans: usize, transfers: usize, duration_secs: f64) {
        self.plans_total.inc_by(plans as u64);
        self.transfers_total.inc_by(transfers as u64);
        self.plan_duration.observe(duration_secs);
    }

    /// Record a failed computation
    pub fn record_failure(&self) {
        self.failures_total.inc();
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("plans_total", &self.plans_total.get())
            .field("failures_total", &self.failures_total.get())
            .field("transfers_total", &self.transfers_total.get())
            .field("plan_samples", &self.plan_duration.get_sample_count())
            .finish()
    }
}
