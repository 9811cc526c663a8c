//! Drives scheduling cycles across the fleet.
//!
//! Every cycle runs two rounds, one after the other:
//!
//! 1. **Protected round**: one task per instance contends for the shared
//!    lock; only the winner runs the job.
//! 2. **Unprotected round**: one task per instance runs the job with no
//!    coordination.
//!
//! Each round ends with a barrier on all of its tasks, so a cycle always
//! starts with the lock free. Failures stay local to the instance that hit
//! them and are reported in the [`CycleReport`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::config::SimulationConfig;
use super::instance::{InstanceOutcome, SchedulerInstance};
use super::job::{ScheduledJob, SimulatedJob};
use super::record::{ExecutionLog, ExecutionMode, ExecutionRecord};
use crate::error::ConfigError;
use crate::lock::{DistributedLock, LockCoordinator};
use crate::metrics::{ComparisonSummary, MetricsAnalyzer, MetricsCollector};

/// An instance whose job failed during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceFailure {
    pub instance_id: String,
    pub mode: ExecutionMode,
    pub error: String,
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Cycle ordinal, starting at 0.
    pub cycle: usize,
    /// Instances that ran the job under the lock.
    pub protected_winners: Vec<String>,
    /// Instances that found the lock held.
    pub skipped: Vec<String>,
    /// Unprotected executions recorded.
    pub unprotected_executions: usize,
    /// Jobs that failed in either round.
    pub failures: Vec<InstanceFailure>,
}

impl CycleReport {
    /// Number of instances that obtained the lock in this cycle.
    ///
    /// A protected job only starts once the lock is held, so failed
    /// protected jobs count as acquisitions too.
    pub fn lock_acquisitions(&self) -> usize {
        self.protected_winners.len()
            + self
                .failures
                .iter()
                .filter(|failure| failure.mode == ExecutionMode::Protected)
                .count()
    }
}

/// Result of a complete simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: SimulationConfig,
    pub cycles: Vec<CycleReport>,
    pub protected_log: Vec<ExecutionRecord>,
    pub unprotected_log: Vec<ExecutionRecord>,
    pub summary: ComparisonSummary,
}

impl SimulationRun {
    /// All failures across every cycle.
    pub fn failures(&self) -> impl Iterator<Item = &InstanceFailure> {
        self.cycles.iter().flat_map(|cycle| cycle.failures.iter())
    }
}

/// Runs the configured number of cycles over a fleet.
pub struct CycleOrchestrator<L: DistributedLock + 'static = LockCoordinator> {
    config: SimulationConfig,
    lock: Arc<L>,
    protected_job: Arc<dyn ScheduledJob>,
    unprotected_job: Arc<dyn ScheduledJob>,
    protected_log: ExecutionLog,
    unprotected_log: ExecutionLog,
    metrics: MetricsCollector,
}

impl CycleOrchestrator<LockCoordinator> {
    /// Creates an orchestrator backed by an in-process lock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid; nothing runs
    /// in that case.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let lock = Arc::new(LockCoordinator::new(config.lock_name.clone()));
        Self::with_lock(config, lock)
    }
}

impl<L: DistributedLock + 'static> CycleOrchestrator<L> {
    /// Creates an orchestrator on top of an existing lock.
    ///
    /// Jobs default to [`SimulatedJob`]s built from the configured work
    /// times.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn with_lock(config: SimulationConfig, lock: Arc<L>) -> Result<Self, ConfigError> {
        config.validate()?;

        let protected_job = Arc::new(SimulatedJob::new(config.protected_work, config.seed));
        let unprotected_job = Arc::new(SimulatedJob::new(config.unprotected_work(), config.seed));

        Ok(Self {
            config,
            lock,
            protected_job,
            unprotected_job,
            protected_log: ExecutionLog::new(ExecutionMode::Protected),
            unprotected_log: ExecutionLog::new(ExecutionMode::Unprotected),
            metrics: MetricsCollector::new(),
        })
    }

    /// Replaces the job run in protected rounds.
    pub fn with_protected_job(mut self, job: Arc<dyn ScheduledJob>) -> Self {
        self.protected_job = job;
        self
    }

    /// Replaces the job run in unprotected rounds.
    pub fn with_unprotected_job(mut self, job: Arc<dyn ScheduledJob>) -> Self {
        self.unprotected_job = job;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The lock shared by the fleet.
    pub fn lock(&self) -> &Arc<L> {
        &self.lock
    }

    /// Runs every cycle and analyzes the resulting logs.
    pub async fn run(self) -> SimulationRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = self.config.cycles;

        info!(
            run_id = %run_id,
            instances = self.config.instances.len(),
            cycles = total,
            lock = %self.config.lock_name,
            "Starting simulation"
        );

        let mut cycles = Vec::with_capacity(total);
        for cycle in 0..total {
            cycles.push(self.run_cycle(cycle).await);

            if cycle + 1 < total {
                info!(delay_ms = self.config.cycle_delay_ms, "Waiting for next scheduling cycle");
                tokio::time::sleep(self.config.cycle_delay()).await;
            }
        }

        let protected_log = self.protected_log.snapshot();
        let unprotected_log = self.unprotected_log.snapshot();
        let summary = MetricsAnalyzer::analyze(&protected_log, &unprotected_log);

        info!(
            run_id = %run_id,
            protected = summary.protected_count(),
            unprotected = summary.unprotected_count(),
            reduction_rate = summary.reduction_rate,
            "Simulation finished"
        );

        SimulationRun {
            run_id,
            started_at,
            finished_at: Utc::now(),
            config: self.config,
            cycles,
            protected_log,
            unprotected_log,
            summary,
        }
    }

    async fn run_cycle(&self, cycle: usize) -> CycleReport {
        info!(
            cycle = cycle + 1,
            total = self.config.cycles,
            "Scheduling cycle started"
        );

        let mut report = CycleReport {
            cycle,
            ..Default::default()
        };

        self.protected_round(cycle, &mut report).await;
        tokio::time::sleep(self.config.round_delay()).await;
        self.unprotected_round(cycle, &mut report).await;

        self.metrics.record_cycle();
        report
    }

    async fn protected_round(&self, cycle: usize, report: &mut CycleReport) {
        let handles: Vec<_> = self
            .config
            .instances
            .iter()
            .map(|id| {
                let instance = SchedulerInstance::new(id.clone());
                let lock = Arc::clone(&self.lock);
                let job = Arc::clone(&self.protected_job);
                let log = self.protected_log.clone();

                tokio::spawn(async move {
                    instance
                        .run_protected(cycle, lock.as_ref(), job.as_ref(), &log)
                        .await
                })
            })
            .collect();

        let results = join_all(handles).await;

        for (id, joined) in self.config.instances.iter().zip(results) {
            match joined {
                Ok(Ok(InstanceOutcome::Executed(record))) => {
                    self.metrics.record_execution(&record);
                    report.protected_winners.push(record.instance_id);
                }
                Ok(Ok(InstanceOutcome::Skipped { .. })) => {
                    self.metrics.record_skip(id);
                    report.skipped.push(id.clone());
                }
                Ok(Err(e)) => self.record_failure(report, id, ExecutionMode::Protected, e.to_string()),
                Err(e) => {
                    error!(instance_id = %id, cycle, error = %e, "Protected task aborted");
                    self.record_failure(report, id, ExecutionMode::Protected, e.to_string());
                }
            }
        }
    }

    async fn unprotected_round(&self, cycle: usize, report: &mut CycleReport) {
        let handles: Vec<_> = self
            .config
            .instances
            .iter()
            .map(|id| {
                let instance = SchedulerInstance::new(id.clone());
                let job = Arc::clone(&self.unprotected_job);
                let log = self.unprotected_log.clone();

                tokio::spawn(async move { instance.run_unprotected(cycle, job.as_ref(), &log).await })
            })
            .collect();

        let results = join_all(handles).await;

        for (id, joined) in self.config.instances.iter().zip(results) {
            match joined {
                Ok(Ok(record)) => {
                    self.metrics.record_execution(&record);
                    report.unprotected_executions += 1;
                }
                Ok(Err(e)) => {
                    self.record_failure(report, id, ExecutionMode::Unprotected, e.to_string())
                }
                Err(e) => {
                    error!(instance_id = %id, cycle, error = %e, "Unprotected task aborted");
                    self.record_failure(report, id, ExecutionMode::Unprotected, e.to_string());
                }
            }
        }
    }

    fn record_failure(&self, report: &mut CycleReport, id: &str, mode: ExecutionMode, error: String) {
        self.metrics.record_failure(mode);
        report.failures.push(InstanceFailure {
            instance_id: id.to_string(),
            mode,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::scheduler::job::{JobContext, WorkDuration};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;

    fn fixed_config(instances: &[&str], cycles: usize) -> SimulationConfig {
        SimulationConfig::new(instances.iter().copied())
            .with_cycles(cycles)
            .with_protected_work(WorkDuration::fixed(Duration::from_secs(5)))
            .with_unprotected_work(Duration::from_secs(2))
    }

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let result = CycleOrchestrator::new(fixed_config(&[], 4));
        assert!(matches!(result, Err(ConfigError::NoInstances)));

        let result = CycleOrchestrator::new(fixed_config(&["a"], 0));
        assert!(matches!(result, Err(ConfigError::NoCycles)));
    }

    #[test]
    fn test_cycle_report_lock_acquisitions() {
        let report = CycleReport {
            cycle: 0,
            protected_winners: vec!["a".to_string()],
            skipped: vec!["b".to_string()],
            unprotected_executions: 2,
            failures: vec![InstanceFailure {
                instance_id: "c".to_string(),
                mode: ExecutionMode::Unprotected,
                error: "boom".to_string(),
            }],
        };
        assert_eq!(report.lock_acquisitions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_winner_per_cycle() {
        let orchestrator = CycleOrchestrator::new(fixed_config(&["a", "b", "c"], 4))
            .expect("valid config");
        let lock = Arc::clone(orchestrator.lock());

        let run = orchestrator.run().await;

        assert_eq!(run.cycles.len(), 4);
        for report in &run.cycles {
            assert_eq!(report.protected_winners.len(), 1);
            assert_eq!(report.skipped.len(), 2);
            assert_eq!(report.unprotected_executions, 3);
            assert!(report.failures.is_empty());
        }
        assert!(!lock.state().is_held());
        assert_eq!(lock.stats().grants, 4);
        assert_eq!(lock.stats().denials, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_match_winners() {
        let orchestrator = CycleOrchestrator::new(fixed_config(&["a", "b", "c"], 3))
            .expect("valid config");

        let run = orchestrator.run().await;

        for report in &run.cycles {
            let recorded: Vec<_> = run
                .protected_log
                .iter()
                .filter(|record| record.cycle == report.cycle)
                .map(|record| record.instance_id.clone())
                .collect();
            assert_eq!(recorded, report.protected_winners);
            assert!(report
                .skipped
                .iter()
                .all(|skipped| !recorded.contains(skipped)));
        }
    }

    struct FlakyJob {
        failing: HashSet<usize>,
    }

    #[async_trait]
    impl ScheduledJob for FlakyJob {
        async fn execute(&self, ctx: &JobContext<'_>) -> Result<Duration, JobError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.failing.contains(&ctx.cycle) {
                return Err(JobError::failed(ctx.instance_id, "flush failed"));
            }
            Ok(Duration::from_secs(1))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_next_cycle_recovers() {
        let job = Arc::new(FlakyJob {
            failing: HashSet::from([0]),
        });
        let orchestrator = CycleOrchestrator::new(fixed_config(&["a", "b"], 2))
            .expect("valid config")
            .with_protected_job(job);

        let run = orchestrator.run().await;

        let first = &run.cycles[0];
        assert!(first.protected_winners.is_empty());
        assert_eq!(first.failures.len(), 1);
        assert_eq!(first.failures[0].mode, ExecutionMode::Protected);
        assert!(first.failures[0].error.contains("flush failed"));
        assert_eq!(first.lock_acquisitions(), 1);
        assert_eq!(first.unprotected_executions, 2);

        let second = &run.cycles[1];
        assert_eq!(second.protected_winners.len(), 1);
        assert!(second.failures.is_empty());

        assert_eq!(run.protected_log.len(), 1);
        assert_eq!(run.failures().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_delays() {
        let config = fixed_config(&["a", "b"], 3)
            .with_round_delay(Duration::from_secs(1))
            .with_cycle_delay(Duration::from_secs(10));
        let orchestrator = CycleOrchestrator::new(config).expect("valid config");

        let start = tokio::time::Instant::now();
        orchestrator.run().await;

        // 3 x (5s protected + 1s gap + 2s unprotected) + 2 x 10s between cycles.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(44), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(45), "elapsed {elapsed:?}");
    }
}
