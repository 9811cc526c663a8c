//! Comparison statistics derived from the two execution logs.
//!
//! Runs only after every cycle has finished; it reads the logs and never
//! mutates them.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::scheduler::ExecutionRecord;

/// Executions of one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeSummary {
    /// Total recorded executions.
    pub executions: usize,
    /// Distinct instances that ran the job.
    pub instances: BTreeSet<String>,
}

impl ModeSummary {
    fn from_log(log: &[ExecutionRecord]) -> Self {
        Self {
            executions: log.len(),
            instances: MetricsAnalyzer::unique_instances(log),
        }
    }

    /// Number of distinct instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// Outcome of comparing the protected run against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The lock removed at least one duplicate execution.
    DuplicatesPrevented,
    /// No difference between the two modes yet.
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatesPrevented => write!(f, "the lock is preventing duplicate executions"),
            Self::Inconclusive => write!(f, "no clear difference between the modes yet"),
        }
    }
}

/// Read-only comparison of the protected and unprotected logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub protected: ModeSummary,
    pub unprotected: ModeSummary,
    /// Percentage of baseline executions removed by the lock.
    pub reduction_rate: f64,
    /// Baseline executions that did not happen under the lock.
    pub prevented_executions: usize,
    pub verdict: Verdict,
}

impl ComparisonSummary {
    /// Executions recorded under the lock.
    pub fn protected_count(&self) -> usize {
        self.protected.executions
    }

    /// Executions recorded without the lock.
    pub fn unprotected_count(&self) -> usize {
        self.unprotected.executions
    }

    /// Reduction rate rounded to one decimal place.
    pub fn reduction_rate_rounded(&self) -> f64 {
        (self.reduction_rate * 10.0).round() / 10.0
    }
}

/// Derives comparison statistics from execution logs.
pub struct MetricsAnalyzer;

impl MetricsAnalyzer {
    /// Compares the protected log against the unprotected baseline.
    pub fn analyze(protected: &[ExecutionRecord], unprotected: &[ExecutionRecord]) -> ComparisonSummary {
        let protected = ModeSummary::from_log(protected);
        let unprotected = ModeSummary::from_log(unprotected);

        let reduction_rate = Self::reduction_rate(protected.executions, unprotected.executions);
        let prevented_executions = unprotected.executions.saturating_sub(protected.executions);
        let verdict = if protected.executions < unprotected.executions {
            Verdict::DuplicatesPrevented
        } else {
            Verdict::Inconclusive
        };

        ComparisonSummary {
            protected,
            unprotected,
            reduction_rate,
            prevented_executions,
            verdict,
        }
    }

    /// Distinct instance identifiers in a log.
    pub fn unique_instances(log: &[ExecutionRecord]) -> BTreeSet<String> {
        log.iter().map(|record| record.instance_id.clone()).collect()
    }

    /// Percentage decrease from `unprotected_count` to `protected_count`.
    ///
    /// Returns 0 when the baseline is empty.
    pub fn reduction_rate(protected_count: usize, unprotected_count: usize) -> f64 {
        if unprotected_count == 0 {
            return 0.0;
        }
        (unprotected_count as f64 - protected_count as f64) / unprotected_count as f64 * 100.0
    }
}
