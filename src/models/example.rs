//! Example models
//!
//! A leaf test case and its per-run lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hook::Body;
use crate::context::Context;
use crate::error::{Failure, Outcome};
use crate::executor::guarded;
use crate::utils::Timing;

/// Classified outcome of an example
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleStatus {
    #[default]
    Unexecuted,
    Passed,
    Failed,
    Pending,
    Skipped,
}

impl ExampleStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ExampleStatus::Unexecuted => " ",
            ExampleStatus::Passed => "✓",
            ExampleStatus::Failed => "✗",
            ExampleStatus::Pending => "*",
            ExampleStatus::Skipped => "○",
        }
    }

    pub fn is_executed(&self) -> bool {
        !matches!(self, ExampleStatus::Unexecuted)
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleStatus::Unexecuted => write!(f, "UNEXECUTED"),
            ExampleStatus::Passed => write!(f, "PASS"),
            ExampleStatus::Failed => write!(f, "FAIL"),
            ExampleStatus::Pending => write!(f, "PENDING"),
            ExampleStatus::Skipped => write!(f, "SKIP"),
        }
    }
}

/// One executable example
pub struct Example {
    title: String,
    body: Body,
    only: bool,
    status: ExampleStatus,
    failure: Option<Failure>,
    message: Option<String>,
    timing: Timing,
}

impl Example {
    pub fn new<F>(title: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        Self {
            title: title.into(),
            body: Box::new(body),
            only: false,
            status: ExampleStatus::Unexecuted,
            failure: None,
            message: None,
            timing: Timing::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn has_only(&self) -> bool {
        self.only
    }

    pub fn mark_only(&mut self) {
        self.only = true;
    }

    /// Execute the body under the given scope
    pub fn run(&self, context: &Context) -> Outcome {
        guarded(|| (self.body)(context))
    }

    pub fn status(&self) -> ExampleStatus {
        self.status
    }

    pub fn is_failure(&self) -> bool {
        self.status == ExampleStatus::Failed
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Pending or skip message
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub(crate) fn timing_mut(&mut self) -> &mut Timing {
        &mut self.timing
    }

    pub(crate) fn passed(&mut self) {
        self.status = ExampleStatus::Passed;
    }

    pub(crate) fn failed(&mut self, failure: Failure) {
        self.status = ExampleStatus::Failed;
        self.failure = Some(failure);
    }

    pub(crate) fn pending(&mut self, message: String) {
        self.status = ExampleStatus::Pending;
        self.message = Some(message);
    }

    pub(crate) fn skipped(&mut self, message: String) {
        self.status = ExampleStatus::Skipped;
        self.message = Some(message);
    }

    /// Forget the outcome of a previous run
    pub fn reset(&mut self) {
        self.status = ExampleStatus::Unexecuted;
        self.failure = None;
        self.message = None;
        self.timing.reset();
    }
}

impl fmt::Debug for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Example")
            .field("title", &self.title)
            .field("only", &self.only)
            .field("status", &self.status)
            .field("failure", &self.failure)
            .field("message", &self.message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{pending, Signal};

    #[test]
    fn test_new_example_is_unexecuted() {
        let example = Example::new("does a thing", |_| Ok(()));
        assert_eq!(example.status(), ExampleStatus::Unexecuted);
        assert!(!example.status().is_executed());
        assert!(!example.has_only());
    }

    #[test]
    fn test_run_returns_body_signal() {
        let example = Example::new("later", |_| pending("not written"));
        match example.run(&Context::new()) {
            Err(Signal::Pending(msg)) => assert_eq!(msg, "not written"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_state_transitions_and_reset() {
        let mut example = Example::new("breaks", |_| Ok(()));
        example.failed(Failure::Message("nope".into()));
        assert!(example.is_failure());
        assert_eq!(example.failure().map(|f| f.to_string()), Some("nope".to_string()));

        example.reset();
        assert_eq!(example.status(), ExampleStatus::Unexecuted);
        assert!(example.failure().is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExampleStatus::Passed.to_string(), "PASS");
        assert_eq!(ExampleStatus::Skipped.symbol(), "○");
    }
}
