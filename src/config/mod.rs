//! Configuration module
//!
//! Engine settings come from a config file, then `DSPEC_*` environment
//! variables, then command-line flags, each layer overriding the last.

pub mod env;
mod file;

pub use env::{EnvBuilder, EnvConfig, EnvGuard, EnvVar};
pub use file::CONFIG_LOCATIONS;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::executor::DEFAULT_WORKERS;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fan root examples out to forked workers
    pub fork: bool,

    /// Number of workers; 0 means the default
    pub workers: usize,

    /// How long the coordinator sleeps between worker status checks
    pub poll_interval_ms: u64,

    /// Log level for the `dspec` target
    pub log_level: String,

    /// Append engine events as JSON lines to this file
    pub events_file: Option<PathBuf>,

    /// Title of the root group
    pub suite_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fork: false,
            workers: DEFAULT_WORKERS,
            poll_interval_ms: 10,
            log_level: "info".to_string(),
            events_file: None,
            suite_title: "Suite".to_string(),
        }
    }
}

impl EngineConfig {
    /// Worker count, never less than one
    pub fn workers(&self) -> usize {
        if self.workers == 0 {
            DEFAULT_WORKERS
        } else {
            self.workers
        }
    }

    /// Apply environment overrides
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if let Some(fork) = env.fork {
            self.fork = fork;
        }
        if let Some(children) = env.children {
            self.workers = children;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        if let Some(path) = &env.events_file {
            self.events_file = Some(PathBuf::from(path));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.fork);
        assert_eq!(config.workers(), 2);
        assert_eq!(config.suite_title, "Suite");
        assert!(config.events_file.is_none());
    }

    #[test]
    fn test_zero_workers_means_default() {
        let config = EngineConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.workers(), DEFAULT_WORKERS);
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvConfig {
            fork: Some(true),
            children: Some(6),
            log_level: Some("debug".to_string()),
            events_file: Some("events.jsonl".to_string()),
            ..Default::default()
        };
        let config = EngineConfig::default().with_env(&env);
        assert!(config.fork);
        assert_eq!(config.workers(), 6);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.events_file, Some(PathBuf::from("events.jsonl")));
    }

    #[test]
    fn test_empty_env_keeps_file_values() {
        let file = EngineConfig {
            fork: true,
            workers: 3,
            ..Default::default()
        };
        assert_eq!(file.clone().with_env(&EnvConfig::default()), file);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("fork: true\n").unwrap();
        assert!(config.fork);
        assert_eq!(config.workers, 2);
        assert_eq!(config.poll_interval_ms, 10);
    }
}
