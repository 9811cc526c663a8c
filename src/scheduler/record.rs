//! Execution records and the append-only logs that hold them.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Policy an instance ran the job under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The job only runs on the instance holding the fleet lock.
    Protected,
    /// Every instance runs the job with no coordination.
    Unprotected,
}

impl ExecutionMode {
    /// Short tag used in the run narrative.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Protected => "LOCK",
            Self::Unprotected => "NO-LOCK",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protected => write!(f, "protected"),
            Self::Unprotected => write!(f, "unprotected"),
        }
    }
}

/// A logged fact that an instance ran the job.
///
/// Created once per successful execution, right after the work completes,
/// and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Fleet instance that ran the job.
    pub instance_id: String,
    /// Cycle the execution belongs to.
    pub cycle: usize,
    /// Policy the execution ran under.
    pub mode: ExecutionMode,
    /// When the instance attempted to run.
    pub start_time: DateTime<Utc>,
    /// Simulated work time.
    pub duration: Duration,
}

impl ExecutionRecord {
    /// Creates a new record.
    pub fn new(
        instance_id: impl Into<String>,
        cycle: usize,
        mode: ExecutionMode,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            cycle,
            mode,
            start_time,
            duration,
        }
    }

    /// Work time in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Append-only log of executions for one mode.
///
/// Clones share the same underlying sequence, so one log can be handed to
/// every concurrent unit of work of a round.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    mode: ExecutionMode,
    records: Arc<Mutex<Vec<ExecutionRecord>>>,
}

impl ExecutionLog {
    /// Creates an empty log for `mode`.
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mode this log collects executions for.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Appends a record.
    pub fn append(&self, record: ExecutionRecord) {
        debug_assert_eq!(record.mode, self.mode);
        self.records().push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Copies the records out in append order.
    pub fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records().clone()
    }

    fn records(&self) -> MutexGuard<'_, Vec<ExecutionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
