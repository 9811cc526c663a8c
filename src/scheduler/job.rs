//! The periodic job run by each fleet instance.
//!
//! - `ScheduledJob`: the job body, called once per instance per round
//! - `SimulatedJob`: a job that only sleeps for a configured work time
//! - `WorkDuration`: fixed or uniformly random work time

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::record::ExecutionMode;
use crate::error::{ConfigError, JobError};

/// How long one execution of the simulated job takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkDuration {
    /// Always the same work time.
    Fixed { ms: u64 },
    /// Drawn uniformly from `[min_ms, max_ms]` for every execution.
    Uniform { min_ms: u64, max_ms: u64 },
}

impl WorkDuration {
    /// Fixed work time.
    pub fn fixed(duration: Duration) -> Self {
        Self::Fixed {
            ms: duration.as_millis() as u64,
        }
    }

    /// Uniformly random work time between `min` and `max` inclusive.
    pub fn uniform(min: Duration, max: Duration) -> Self {
        Self::Uniform {
            min_ms: min.as_millis() as u64,
            max_ms: max.as_millis() as u64,
        }
    }

    /// Checks that a random range is not inverted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Uniform { min_ms, max_ms } if min_ms > max_ms => {
                Err(ConfigError::InvalidWorkRange { min_ms, max_ms })
            }
            _ => Ok(()),
        }
    }

    /// Shortest possible work time.
    pub fn min(&self) -> Duration {
        match *self {
            Self::Fixed { ms } => Duration::from_millis(ms),
            Self::Uniform { min_ms, .. } => Duration::from_millis(min_ms),
        }
    }

    /// Longest possible work time.
    pub fn max(&self) -> Duration {
        match *self {
            Self::Fixed { ms } => Duration::from_millis(ms),
            Self::Uniform { max_ms, .. } => Duration::from_millis(max_ms),
        }
    }

    /// Draws one work time.
    pub fn sample<R: RngExt>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Fixed { ms } => Duration::from_millis(ms),
            Self::Uniform { min_ms, max_ms } if min_ms >= max_ms => Duration::from_millis(min_ms),
            Self::Uniform { min_ms, max_ms } => {
                Duration::from_millis(rng.random_range(min_ms..=max_ms))
            }
        }
    }
}

/// What a job is told about the execution it is performing.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    /// Instance running the job.
    pub instance_id: &'a str,
    /// Cycle ordinal.
    pub cycle: usize,
    /// Policy the job runs under.
    pub mode: ExecutionMode,
}

/// Body of the periodic job.
///
/// Returns the work time on success. In protected mode the caller holds the
/// fleet lock for the whole call and releases it afterwards whatever the
/// outcome.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn execute(&self, ctx: &JobContext<'_>) -> Result<Duration, JobError>;
}

/// Job that simulates work by sleeping.
pub struct SimulatedJob {
    work: WorkDuration,
    rng: Mutex<ChaCha8Rng>,
}

impl SimulatedJob {
    /// Creates a job whose work times come from `work`.
    ///
    /// With a seed the sequence of work times is reproducible.
    pub fn new(work: WorkDuration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self {
            work,
            rng: Mutex::new(rng),
        }
    }

    /// Work time configuration.
    pub fn work(&self) -> WorkDuration {
        self.work
    }

    fn next_duration(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.work.sample(&mut *rng)
    }
}

#[async_trait]
impl ScheduledJob for SimulatedJob {
    async fn execute(&self, _ctx: &JobContext<'_>) -> Result<Duration, JobError> {
        let duration = self.next_duration();
        tokio::time::sleep(duration).await;
        Ok(duration)
    }
}

impl std::fmt::Debug for SimulatedJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedJob")
            .field("work", &self.work)
            .finish()
    }
}
