//! Logging setup
//!
//! Engine diagnostics are emitted under the `dspec` target. Example results
//! reach the log through the reporter's tracing sink; this module only decides
//! how verbose that output is and where it goes.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Verbosity of engine diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const NAMES: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    pub fn as_str(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Parse a level name; `warning` is accepted for `warn`
    pub fn from_str(s: &str) -> Option<Self> {
        let name = s.trim().to_ascii_lowercase();
        let name = if name == "warning" { "warn" } else { name.as_str() };
        [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ]
        .into_iter()
        .find(|level| level.as_str() == name)
    }

    /// One step more verbose, saturating at trace
    pub fn more_verbose(self) -> Self {
        match self {
            LogLevel::Error => LogLevel::Warn,
            LogLevel::Warn => LogLevel::Info,
            LogLevel::Info => LogLevel::Debug,
            LogLevel::Debug | LogLevel::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!("dspec={}", level.as_str()))
}

/// Install a stderr subscriber for dspec diagnostics
///
/// `RUST_LOG`, when set, replaces the level-derived filter. Stdout is left to
/// the run summary. A subscriber installed earlier by an embedding test
/// binary stays in place.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    if installed.is_err() {
        tracing::debug!("keeping the existing tracing subscriber");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::from_str(" DEBUG "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Error.as_str(), "error");
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_more_verbose() {
        assert_eq!(LogLevel::Info.more_verbose(), LogLevel::Debug);
        assert_eq!(LogLevel::Trace.more_verbose(), LogLevel::Trace);
        assert!(LogLevel::Debug < LogLevel::Info);
    }

    #[test]
    fn test_filter_targets_crate() {
        assert_eq!(filter_for(LogLevel::Warn).to_string(), "dspec=warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logger(LogLevel::Error);
        init_logger(LogLevel::Trace);
    }
}
