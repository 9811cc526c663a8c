//! fleetlock: duplicate-execution simulator for scheduler fleets.
//!
//! This library models redundant scheduler instances that fire the same
//! periodic job, runs them with and without a shared lock, and measures how
//! many duplicate executions the lock removes. It also ships a small utility
//! for refreshing a YAML copy of a service's OpenAPI document.

pub mod apidocs;
pub mod cli;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod scheduler;

// Re-export commonly used types
pub use error::{ApiDocsError, ConfigError, JobError};
pub use lock::{DistributedLock, LockCoordinator, LockGuard};
pub use metrics::{ComparisonSummary, MetricsAnalyzer};
pub use scheduler::{
    CycleOrchestrator, ExecutionRecord, SchedulerInstance, SimulationConfig, SimulationRun,
};
