//! Execution accounting for simulation runs.
//!
//! - `analyzer`: comparison statistics computed from the two execution logs
//!   once a run is over
//! - `prometheus` / `collectors`: live Prometheus counters mirroring the same
//!   events while the run is in progress
//!
//! # Example
//!
//! ```ignore
//! use fleetlock::metrics::MetricsAnalyzer;
//!
//! let summary = MetricsAnalyzer::analyze(&protected_log, &unprotected_log);
//! println!("{:.1}% fewer executions", summary.reduction_rate);
//! ```

pub mod analyzer;
pub mod collectors;
pub mod prometheus;

pub use analyzer::{ComparisonSummary, MetricsAnalyzer, ModeSummary, Verdict};
pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};
