//! Metric recording for simulation events.
//!
//! `MetricsCollector` wraps the raw Prometheus metrics with one method per
//! event the orchestrator reports. Recording before `init_metrics()` is a
//! silent no-op.

use super::prometheus::{
    CYCLES_TOTAL, EXECUTIONS_TOTAL, EXECUTION_DURATION, JOB_FAILURES_TOTAL, LOCK_SKIPS_TOTAL,
};
use crate::scheduler::{ExecutionMode, ExecutionRecord};

/// Records simulation events into the global Prometheus metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    /// Create a new MetricsCollector instance.
    pub fn new() -> Self {
        Self
    }

    /// Record a completed execution.
    pub fn record_execution(&self, record: &ExecutionRecord) {
        let mode = record.mode.to_string();

        if let Some(executions) = EXECUTIONS_TOTAL.get() {
            executions
                .with_label_values(&[mode.as_str(), record.instance_id.as_str()])
                .inc();
        }

        if let Some(duration) = EXECUTION_DURATION.get() {
            duration
                .with_label_values(&[mode.as_str()])
                .observe(record.duration_secs());
        }

        tracing::trace!(
            mode = %record.mode,
            instance_id = %record.instance_id,
            duration_secs = record.duration_secs(),
            "Recorded execution metric"
        );
    }

    /// Record a protected attempt that found the lock held.
    pub fn record_skip(&self, instance_id: &str) {
        if let Some(skips) = LOCK_SKIPS_TOTAL.get() {
            skips.with_label_values(&[instance_id]).inc();
        }
    }

    /// Record a failed execution.
    pub fn record_failure(&self, mode: ExecutionMode) {
        if let Some(failures) = JOB_FAILURES_TOTAL.get() {
            failures.with_label_values(&[mode.to_string().as_str()]).inc();
        }
    }

    /// Record a finished cycle.
    pub fn record_cycle(&self) {
        if let Some(cycles) = CYCLES_TOTAL.get() {
            cycles.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{export_metrics, init_metrics};
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_collector_records_into_registry() {
        init_metrics().expect("metrics init");
        let collector = MetricsCollector::new();

        collector.record_execution(&ExecutionRecord::new(
            "collector-node",
            0,
            ExecutionMode::Unprotected,
            Utc::now(),
            Duration::from_secs(2),
        ));
        collector.record_skip("collector-node");
        collector.record_failure(ExecutionMode::Protected);
        collector.record_cycle();

        let metrics = export_metrics();
        assert!(metrics.contains("fleetlock_executions_total"));
        assert!(metrics.contains("collector-node"));
        assert!(metrics.contains("fleetlock_lock_skips_total"));
        assert!(metrics.contains("fleetlock_job_failures_total"));
        assert!(metrics.contains("fleetlock_cycles_total"));
    }
}
