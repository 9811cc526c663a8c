//! Configuration for a simulation run.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::job::WorkDuration;
use crate::error::ConfigError;

/// Default name of the lock guarding the periodic job.
pub const DEFAULT_LOCK_NAME: &str = "periodic-job";

/// Configuration for one simulation run.
///
/// Can be built in code with the `with_*` methods or loaded from YAML:
///
/// ```yaml
/// instances: [node-1, node-2, node-3]
/// cycles: 4
/// cycle_delay_ms: 5000
/// round_delay_ms: 1000
/// protected_work:
///   kind: uniform
///   min_ms: 3000
///   max_ms: 7000
/// unprotected_work_ms: 2000
/// seed: 42
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Name of the lock shared by the fleet.
    pub lock_name: String,
    /// Identifiers of the fleet instances.
    pub instances: Vec<String>,
    /// Number of scheduling cycles to run.
    pub cycles: usize,
    /// Pause after each cycle except the last.
    pub cycle_delay_ms: u64,
    /// Pause between the protected and unprotected rounds of a cycle.
    pub round_delay_ms: u64,
    /// Work time of a lock-protected execution.
    pub protected_work: WorkDuration,
    /// Work time of an unprotected execution.
    pub unprotected_work_ms: u64,
    /// Seed for reproducible work times.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            instances: vec![
                "node-1".to_string(),
                "node-2".to_string(),
                "node-3".to_string(),
            ],
            cycles: 4,
            cycle_delay_ms: 5000,
            round_delay_ms: 1000,
            protected_work: WorkDuration::Uniform {
                min_ms: 3000,
                max_ms: 7000,
            },
            unprotected_work_ms: 2000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for the given fleet with default timings.
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: instances.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Sets the lock name.
    pub fn with_lock_name(mut self, name: impl Into<String>) -> Self {
        self.lock_name = name.into();
        self
    }

    /// Sets the number of cycles.
    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    /// Sets the pause between cycles.
    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the pause between the two rounds of a cycle.
    pub fn with_round_delay(mut self, delay: Duration) -> Self {
        self.round_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the protected-mode work time.
    pub fn with_protected_work(mut self, work: WorkDuration) -> Self {
        self.protected_work = work;
        self
    }

    /// Sets the unprotected-mode work time.
    pub fn with_unprotected_work(mut self, work: Duration) -> Self {
        self.unprotected_work_ms = work.as_millis() as u64;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pause after each cycle.
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    /// Pause between rounds.
    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    /// Unprotected-mode work time.
    pub fn unprotected_work(&self) -> WorkDuration {
        WorkDuration::Fixed {
            ms: self.unprotected_work_ms,
        }
    }

    /// Checks the configuration before any work is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }

        let mut seen = HashSet::new();
        for (position, id) in self.instances.iter().enumerate() {
            if id.is_empty() {
                return Err(ConfigError::EmptyInstanceId(position));
            }
            if !is_valid_instance_id(id) {
                return Err(ConfigError::InvalidInstanceId(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::DuplicateInstanceId(id.clone()));
            }
        }

        if self.cycles == 0 {
            return Err(ConfigError::NoCycles);
        }

        self.protected_work.validate()
    }
}

fn is_valid_instance_id(id: &str) -> bool {
    id.chars()
        .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
}
