//! `DSPEC_*` environment overrides
//!
//! Every recognized variable is an [`EnvVar`]; help text, the current-value
//! summary and the test builder all walk the same table.

use std::env;
use std::fmt;

/// A recognized environment variable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvVar {
    Fork,
    Children,
    Config,
    Log,
    Events,
}

impl EnvVar {
    pub const ALL: [EnvVar; 5] = [
        EnvVar::Fork,
        EnvVar::Children,
        EnvVar::Config,
        EnvVar::Log,
        EnvVar::Events,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EnvVar::Fork => "DSPEC_FORK",
            EnvVar::Children => "DSPEC_CHILDREN",
            EnvVar::Config => "DSPEC_CONFIG",
            EnvVar::Log => "DSPEC_LOG",
            EnvVar::Events => "DSPEC_EVENTS",
        }
    }

    fn help(self) -> &'static str {
        match self {
            EnvVar::Fork => "Run root examples in forked workers (1/0)",
            EnvVar::Children => "Number of workers; non-positive means the default of 2",
            EnvVar::Config => "Path to a YAML or JSON configuration file",
            EnvVar::Log => "Log level (trace, debug, info, warn, error)",
            EnvVar::Events => "Append engine events as JSON lines to this file",
        }
    }

    /// Current value, if set
    pub fn read(self) -> Option<String> {
        env::var(self.key()).ok()
    }
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

/// Overrides read from the environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub fork: Option<bool>,
    /// Only positive counts; anything else is treated as unset
    pub children: Option<usize>,
    pub config_file: Option<String>,
    pub log_level: Option<String>,
    pub events_file: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Self {
        Self {
            fork: EnvVar::Fork.read().map(|v| is_enabled(&v)),
            children: EnvVar::Children.read().and_then(|v| positive_count(&v)),
            config_file: EnvVar::Config.read(),
            log_level: EnvVar::Log.read(),
            events_file: EnvVar::Events.read(),
        }
    }

    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Print the values this process sees
    pub fn print_summary(&self) {
        let shown = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());
        println!("Environment Configuration:");
        for var in EnvVar::ALL {
            let value = match var {
                EnvVar::Fork => self.fork.map(|f| f.to_string()),
                EnvVar::Children => self.children.map(|n| n.to_string()),
                EnvVar::Config => self.config_file.clone(),
                EnvVar::Log => self.log_level.clone(),
                EnvVar::Events => self.events_file.clone(),
            };
            println!("  {:<16} {}", var, shown(value));
        }
    }
}

fn is_enabled(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn positive_count(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
}

/// Sets variables for a test and restores them afterwards
#[derive(Debug, Default)]
pub struct EnvBuilder {
    vars: Vec<(EnvVar, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, var: EnvVar, value: impl ToString) -> Self {
        self.vars.push((var, value.to_string()));
        self
    }

    /// Apply the variables; the guard restores the previous values on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous = self
            .vars
            .iter()
            .map(|(var, _)| (*var, var.read()))
            .collect();
        for (var, value) in &self.vars {
            env::set_var(var.key(), value);
        }
        EnvGuard { previous }
    }
}

/// Restores the variables an [`EnvBuilder`] changed
#[derive(Debug)]
pub struct EnvGuard {
    previous: Vec<(EnvVar, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (var, value) in &self.previous {
            match value {
                Some(v) => env::set_var(var.key(), v),
                None => env::remove_var(var.key()),
            }
        }
    }
}

pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    for var in EnvVar::ALL {
        println!("  {:<16} {}", var, var.help());
    }
    println!();
    println!("Example:");
    println!("  {}=1 {}=4 dspec run", EnvVar::Fork, EnvVar::Children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Unset everything for the duration of a test
    fn clear() -> EnvGuard {
        let guard = EnvVar::ALL
            .into_iter()
            .fold(EnvBuilder::new(), |b, var| b.set(var, ""))
            .apply_scoped();
        for var in EnvVar::ALL {
            env::remove_var(var.key());
        }
        guard
    }

    #[test]
    fn test_default_has_nothing() {
        assert!(!EnvConfig::default().has_any());
    }

    #[test]
    #[serial]
    fn test_load_overrides() {
        let _clean = clear();
        let _guard = EnvBuilder::new()
            .set(EnvVar::Fork, 1)
            .set(EnvVar::Children, 4)
            .set(EnvVar::Log, "debug")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.fork, Some(true));
        assert_eq!(config.children, Some(4));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.events_file.is_none());
        assert!(config.has_any());
    }

    #[test]
    #[serial]
    fn test_non_positive_children_unset() {
        let _clean = clear();
        for raw in ["0", "-3", "many"] {
            let _guard = EnvBuilder::new().set(EnvVar::Children, raw).apply_scoped();
            assert_eq!(EnvConfig::load().children, None, "DSPEC_CHILDREN={raw}");
        }
    }

    #[test]
    #[serial]
    fn test_fork_toggle_values() {
        let _clean = clear();
        for (raw, expected) in [("1", true), ("ON", true), ("0", false), ("no", false)] {
            let _guard = EnvBuilder::new().set(EnvVar::Fork, raw).apply_scoped();
            assert_eq!(EnvConfig::load().fork, Some(expected), "DSPEC_FORK={raw}");
        }
    }

    #[test]
    #[serial]
    fn test_guard_restores() {
        let _clean = clear();
        {
            let _guard = EnvBuilder::new()
                .set(EnvVar::Events, "/tmp/a.jsonl")
                .set(EnvVar::Events, "/tmp/b.jsonl")
                .apply_scoped();
            assert_eq!(EnvConfig::load().events_file.as_deref(), Some("/tmp/b.jsonl"));
        }
        assert!(EnvVar::Events.read().is_none());
    }
}
