//! Result models
//!
//! Snapshots handed to the reporter and the run summary built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Example, ExampleStatus, HookPhase};
use crate::error::ContextHookError;

/// Classified outcome of one example execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExampleReport {
    pub title: String,
    /// Group titles from the root down to the example's group
    pub path: Vec<String>,
    pub status: ExampleStatus,
    /// Pending or skip message
    pub message: Option<String>,
    pub failure: Option<String>,
    pub failure_kind: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub pid: u32,
}

impl ExampleReport {
    pub fn from_example(example: &Example, path: Vec<String>) -> Self {
        Self {
            title: example.title().to_string(),
            path,
            status: example.status(),
            message: example.message().map(str::to_string),
            failure: example.failure().map(|f| f.to_string()),
            failure_kind: example.failure().map(|f| f.kind().to_string()),
            started_at: example.timing().started_at(),
            finished_at: example.timing().finished_at(),
            duration_ms: example.timing().elapsed_ms(),
            pid: std::process::id(),
        }
    }

    /// Group path and title joined with spaces
    pub fn full_title(&self) -> String {
        let mut parts: Vec<&str> = self.path.iter().map(String::as_str).collect();
        parts.push(&self.title);
        parts.join(" ")
    }
}

impl fmt::Display for ExampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.full_title(),
            self.duration_ms
        )?;
        if let Some(msg) = self.failure.as_ref().or(self.message.as_ref()) {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// A context-level hook failure, owned by its group rather than an example
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupFailure {
    pub group: String,
    pub phase: HookPhase,
    pub message: String,
}

impl From<&ContextHookError> for GroupFailure {
    fn from(err: &ContextHookError) -> Self {
        Self {
            group: err.group.clone(),
            phase: err.phase,
            message: err.signal.to_string(),
        }
    }
}

/// Totals of one run as seen by this process
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub group_failures: Vec<GroupFailure>,
    pub duration_ms: u64,
    pub has_failure: bool,
    /// Examples of this run executed in forked workers, not listed here
    pub forked: bool,
    pub results: Vec<ExampleReport>,
}

impl RunSummary {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_success(&self) -> bool {
        !self.has_failure
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        for failure in &self.group_failures {
            writeln!(f, "  ! {} {} - {}", failure.group, failure.phase, failure.message)?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Pending: {} | Skip: {}",
            self.total, self.passed, self.failed, self.pending, self.skipped
        )?;
        if self.forked {
            writeln!(f, "Examples ran in forked workers; see the event stream for their results")?;
        }
        write!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms | {}",
            self.pass_rate(),
            self.duration_ms,
            if self.has_failure { "FAILED" } else { "OK" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;

    #[test]
    fn test_report_from_failed_example() {
        let mut example = Example::new("divides", |_| Ok(()));
        example.failed(Failure::UndefinedFixture("divisor".into()));

        let report = ExampleReport::from_example(&example, vec!["Math".into(), "division".into()]);
        assert_eq!(report.status, ExampleStatus::Failed);
        assert_eq!(report.failure_kind.as_deref(), Some("undefined_fixture"));
        assert_eq!(report.full_title(), "Math division divides");
        assert_eq!(report.pid, std::process::id());
        assert!(report.to_string().contains("undefined fixture `divisor`"));
    }

    #[test]
    fn test_pass_rate() {
        let summary = RunSummary {
            total: 4,
            passed: 3,
            failed: 1,
            pending: 0,
            skipped: 0,
            group_failures: Vec::new(),
            duration_ms: 5,
            has_failure: true,
            forked: false,
            results: Vec::new(),
        };
        assert_eq!(summary.pass_rate(), 75.0);
        assert!(!summary.is_success());
        assert!(summary.to_string().ends_with("FAILED"));
    }
}
