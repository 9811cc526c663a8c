//! A single fleet node attempting to run the periodic job.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{info, warn};

use super::job::{JobContext, ScheduledJob};
use super::record::{ExecutionLog, ExecutionMode, ExecutionRecord};
use crate::error::JobError;
use crate::lock::{DistributedLock, LockGuard};

/// What happened when an instance tried to run the job.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceOutcome {
    /// The job ran and this record was appended to the log.
    Executed(ExecutionRecord),
    /// Another instance held the lock; nothing was recorded.
    Skipped {
        /// Holder observed right after the refused acquire.
        holder: Option<String>,
    },
}

impl InstanceOutcome {
    /// Returns true if the job ran.
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }
}

/// One node of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchedulerInstance {
    id: String,
}

impl SchedulerInstance {
    /// Creates an instance with a stable identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Instance identifier, also used as the lock-holder token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Runs the job only if this instance wins the lock.
    ///
    /// A refused acquire returns [`InstanceOutcome::Skipped`] at once. Once
    /// acquired, the lock is released after the job whether it succeeds,
    /// fails or panics; failures come back as `Err`.
    pub async fn run_protected<L, J>(
        &self,
        cycle: usize,
        lock: &L,
        job: &J,
        log: &ExecutionLog,
    ) -> Result<InstanceOutcome, JobError>
    where
        L: DistributedLock + ?Sized,
        J: ScheduledJob + ?Sized,
    {
        let mode = ExecutionMode::Protected;
        let start_time = Utc::now();

        let Some(guard) = LockGuard::try_acquire(lock, &self.id) else {
            let holder = lock.holder();
            info!(
                mode = mode.tag(),
                instance_id = %self.id,
                cycle,
                holder = holder.as_deref().unwrap_or("unknown"),
                "Lock already held, skipping"
            );
            return Ok(InstanceOutcome::Skipped { holder });
        };

        info!(mode = mode.tag(), instance_id = %self.id, cycle, "Lock acquired, job started");

        let outcome = self
            .execute(cycle, mode, start_time, job, log)
            .await
            .map(InstanceOutcome::Executed);

        drop(guard);
        outcome
    }

    /// Runs the job with no coordination at all.
    ///
    /// Every successful call appends exactly one record.
    pub async fn run_unprotected<J>(
        &self,
        cycle: usize,
        job: &J,
        log: &ExecutionLog,
    ) -> Result<ExecutionRecord, JobError>
    where
        J: ScheduledJob + ?Sized,
    {
        let mode = ExecutionMode::Unprotected;
        let start_time = Utc::now();

        info!(mode = mode.tag(), instance_id = %self.id, cycle, "Running job without lock");

        self.execute(cycle, mode, start_time, job, log).await
    }

    async fn execute<J>(
        &self,
        cycle: usize,
        mode: ExecutionMode,
        start_time: chrono::DateTime<Utc>,
        job: &J,
        log: &ExecutionLog,
    ) -> Result<ExecutionRecord, JobError>
    where
        J: ScheduledJob + ?Sized,
    {
        let ctx = JobContext {
            instance_id: &self.id,
            cycle,
            mode,
        };

        match self.execute_caught(job, &ctx).await {
            Ok(duration) => {
                let record = ExecutionRecord::new(&self.id, cycle, mode, start_time, duration);
                log.append(record.clone());
                info!(
                    mode = mode.tag(),
                    instance_id = %self.id,
                    cycle,
                    duration_secs = record.duration_secs(),
                    "Job completed"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(mode = mode.tag(), instance_id = %self.id, cycle, error = %e, "Job failed");
                Err(e)
            }
        }
    }

    async fn execute_caught<J>(&self, job: &J, ctx: &JobContext<'_>) -> Result<Duration, JobError>
    where
        J: ScheduledJob + ?Sized,
    {
        match AssertUnwindSafe(job.execute(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(JobError::Panicked {
                instance_id: self.id.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
