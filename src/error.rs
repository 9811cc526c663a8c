//! Error types for fleetlock operations.
//!
//! Defines error types for the major subsystems:
//! - Simulation configuration
//! - Scheduled job execution
//! - API document conversion

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a simulation configuration.
///
/// All of these are reported before any unit of work is spawned, so a
/// rejected configuration never produces a partial run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Fleet must contain at least one instance")]
    NoInstances,

    #[error("Instance id at position {0} is empty")]
    EmptyInstanceId(usize),

    #[error("Invalid instance id '{0}': only alphanumeric characters, '-', '_' and '.' are allowed")]
    InvalidInstanceId(String),

    #[error("Instance id '{0}' appears more than once in the fleet")]
    DuplicateInstanceId(String),

    #[error("Cycle count must be at least 1")]
    NoCycles,

    #[error("Invalid work duration range [{min_ms}ms, {max_ms}ms]: min must be <= max")]
    InvalidWorkRange { min_ms: u64, max_ms: u64 },

    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors produced by a scheduled job while it runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job failed on instance '{instance_id}': {reason}")]
    Failed { instance_id: String, reason: String },

    #[error("Job panicked on instance '{instance_id}': {message}")]
    Panicked {
        instance_id: String,
        message: String,
    },
}

impl JobError {
    /// Creates a failure for the given instance.
    pub fn failed(instance_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            instance_id: instance_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns the instance the failure happened on.
    pub fn instance_id(&self) -> &str {
        match self {
            Self::Failed { instance_id, .. } | Self::Panicked { instance_id, .. } => instance_id,
        }
    }
}

/// Errors that can occur while fetching, validating or saving an API document.
#[derive(Debug, Error)]
pub enum ApiDocsError {
    #[error("Failed to fetch API document from '{url}': {reason}")]
    Transport { url: String, reason: String },

    #[error("Invalid JSON response: {0}")]
    MalformedResponse(String),

    #[error("Invalid OpenAPI format: missing '{0}' field")]
    MissingField(&'static str),

    #[error("No API paths found in OpenAPI document")]
    NoPaths,

    #[error("YAML serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to save YAML file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidWorkRange {
            min_ms: 7000,
            max_ms: 3000,
        };
        assert!(err.to_string().contains("7000ms"));

        let err = ConfigError::DuplicateInstanceId("node-1".to_string());
        assert!(err.to_string().contains("node-1"));
    }

    #[test]
    fn test_job_error_instance_id() {
        let err = JobError::failed("node-2", "database unavailable");
        assert_eq!(err.instance_id(), "node-2");
        assert!(err.to_string().contains("database unavailable"));

        let err = JobError::Panicked {
            instance_id: "node-3".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.instance_id(), "node-3");
    }

    #[test]
    fn test_api_docs_error_display() {
        assert!(ApiDocsError::MissingField("info")
            .to_string()
            .contains("'info'"));
        assert!(ApiDocsError::NoPaths.to_string().contains("paths"));
    }
}
