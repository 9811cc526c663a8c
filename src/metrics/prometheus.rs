//! Prometheus metrics registration and export.
//!
//! This module defines the Prometheus metrics used by fleetlock and provides
//! functions for initializing, registering, and exporting them.

use prometheus::{CounterVec, Encoder, HistogramVec, IntCounter, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock, PoisonError};

static INIT: Mutex<()> = Mutex::new(());

/// Global Prometheus registry for all fleetlock metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total job executions, labeled by mode and instance.
pub static EXECUTIONS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Job work time in seconds, labeled by mode.
pub static EXECUTION_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Protected attempts skipped because the lock was held, labeled by instance.
pub static LOCK_SKIPS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Failed job executions, labeled by mode.
pub static JOB_FAILURES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Completed scheduling cycles.
pub static CYCLES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. Later calls are no-ops.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically due to
/// duplicate metric names or invalid metric configurations.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _init = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let executions_total = CounterVec::new(
        Opts::new("fleetlock_executions_total", "Total job executions"),
        &["mode", "instance"],
    )?;

    let execution_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "fleetlock_execution_duration_seconds",
            "Job work time in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 30.0]),
        &["mode"],
    )?;

    let lock_skips_total = CounterVec::new(
        Opts::new(
            "fleetlock_lock_skips_total",
            "Protected attempts skipped because the lock was held",
        ),
        &["instance"],
    )?;

    let job_failures_total = CounterVec::new(
        Opts::new("fleetlock_job_failures_total", "Failed job executions"),
        &["mode"],
    )?;

    let cycles_total = IntCounter::new("fleetlock_cycles_total", "Completed scheduling cycles")?;

    registry.register(Box::new(executions_total.clone()))?;
    registry.register(Box::new(execution_duration.clone()))?;
    registry.register(Box::new(lock_skips_total.clone()))?;
    registry.register(Box::new(job_failures_total.clone()))?;
    registry.register(Box::new(cycles_total.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = EXECUTIONS_TOTAL.set(executions_total);
    let _ = EXECUTION_DURATION.set(execution_duration);
    let _ = LOCK_SKIPS_TOTAL.set(lock_skips_total);
    let _ = JOB_FAILURES_TOTAL.set(job_failures_total);
    let _ = CYCLES_TOTAL.set(cycles_total);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns an explanatory comment line instead if the registry has not been
/// initialized or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        let result = init_metrics();
        assert!(result.is_ok() || REGISTRY.get().is_some());
    }

    #[test]
    fn test_metrics_after_init() {
        let _ = init_metrics();

        if let Some(executions) = EXECUTIONS_TOTAL.get() {
            executions.with_label_values(&["protected", "node-1"]).inc();
        }

        let metrics = export_metrics();
        assert!(!metrics.is_empty());
        assert!(!metrics.starts_with("# Error"));
        assert!(metrics.contains("fleetlock_executions_total"));
    }
}
