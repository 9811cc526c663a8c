//! Fleet scheduling with and without a shared lock.
//!
//! This module simulates a fleet of scheduler instances that all fire the
//! same periodic job at the same moment:
//!
//! - **SchedulerInstance**: one fleet member, runs the job protected or not
//! - **ScheduledJob**: the job body, [`SimulatedJob`] by default
//! - **CycleOrchestrator**: runs both rounds of every cycle and collects logs
//! - **ExecutionLog**: append-only record of completed executions per mode
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │  CycleOrchestrator  │
//!                    └──────────┬──────────┘
//!                               │ spawn one task per instance
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//!   ┌───────────┐         ┌───────────┐         ┌───────────┐
//!   │ instance A│         │ instance B│         │ instance C│
//!   └─────┬─────┘         └─────┬─────┘         └─────┬─────┘
//!         │    try_acquire      │                     │
//!         └──────────►┌─────────▼─────────┐◄──────────┘
//!                     │  LockCoordinator  │
//!                     └───────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetlock::scheduler::{CycleOrchestrator, SimulationConfig};
//!
//! let config = SimulationConfig::new(["seoul-8001", "seoul-8002", "seoul-8003"]);
//! let run = CycleOrchestrator::new(config)?.run().await;
//! println!("{}", run.summary.verdict);
//! ```

pub mod config;
pub mod instance;
pub mod job;
pub mod orchestrator;
pub mod record;

pub use config::{SimulationConfig, DEFAULT_LOCK_NAME};
pub use instance::{InstanceOutcome, SchedulerInstance};
pub use job::{JobContext, ScheduledJob, SimulatedJob, WorkDuration};
pub use orchestrator::{CycleOrchestrator, CycleReport, InstanceFailure, SimulationRun};
pub use record::{ExecutionLog, ExecutionMode, ExecutionRecord};
