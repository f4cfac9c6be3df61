//! Error and signal types
//!
//! Example bodies, hooks and fixture factories report how they ended through
//! [`Signal`]. The engine pattern-matches on the signal kind to classify an
//! example; nothing here relies on unwinding except the panic trap.

use std::fmt;

use thiserror::Error;

use crate::models::HookPhase;

/// What an example body, hook or fixture factory returns
pub type Outcome = Result<(), Signal>;

/// Non-normal completion of a body
#[derive(Error, Debug)]
pub enum Signal {
    /// Body declared itself incomplete
    #[error("pending: {0}")]
    Pending(String),

    /// Body declined to run
    #[error("skipped: {0}")]
    Skipped(String),

    /// Anything else went wrong
    #[error(transparent)]
    Failure(#[from] Failure),
}

impl Signal {
    pub fn is_failure(&self) -> bool {
        matches!(self, Signal::Failure(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Pending(_) => "pending",
            Signal::Skipped(_) => "skipped",
            Signal::Failure(_) => "failure",
        }
    }
}

impl From<anyhow::Error> for Signal {
    fn from(err: anyhow::Error) -> Self {
        Signal::Failure(Failure::Error(err))
    }
}

/// Cause captured for a failed example
#[derive(Error, Debug)]
pub enum Failure {
    #[error("undefined fixture `{0}`")]
    UndefinedFixture(String),

    #[error("fixture `{name}` is not a `{expected}`")]
    FixtureType { name: String, expected: &'static str },

    #[error("fixture `{0}` depends on itself")]
    CyclicFixture(String),

    #[error("panicked at {location}: {message}")]
    Panic { message: String, location: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Error(anyhow::Error),

    #[error("worker {0} ended without reporting an exit status")]
    WorkerLost(i32),
}

impl Failure {
    /// Short machine-friendly kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::UndefinedFixture(_) => "undefined_fixture",
            Failure::FixtureType { .. } => "fixture_type",
            Failure::CyclicFixture(_) => "cyclic_fixture",
            Failure::Panic { .. } => "panic",
            Failure::Message(_) => "message",
            Failure::Error(_) => "error",
            Failure::WorkerLost(_) => "worker_lost",
        }
    }
}

/// Errors raised while building the spec tree
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("add only supports examples, example groups and hooks, got `{0}`")]
    UnsupportedNodeKind(String),
}

/// A `beforeContext` or `afterContext` hook failed
///
/// This is not caught at the example boundary: it leaves the group's run and
/// every enclosing group's run, abandoning their remaining children.
#[derive(Debug)]
pub struct ContextHookError {
    pub group: String,
    pub phase: HookPhase,
    pub signal: Signal,
}

impl ContextHookError {
    pub fn new(group: impl Into<String>, phase: HookPhase, signal: Signal) -> Self {
        Self {
            group: group.into(),
            phase,
            signal,
        }
    }
}

impl fmt::Display for ContextHookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hook of `{}` failed: {}", self.phase, self.group, self.signal)
    }
}

impl std::error::Error for ContextHookError {}

/// Signal that the example is not finished yet
pub fn pending(message: impl Into<String>) -> Outcome {
    Err(Signal::Pending(message.into()))
}

/// Signal that the example should not run
pub fn skip(message: impl Into<String>) -> Outcome {
    Err(Signal::Skipped(message.into()))
}

/// Signal a plain failure
pub fn fail(message: impl Into<String>) -> Outcome {
    Err(Signal::Failure(Failure::Message(message.into())))
}

/// Fail the current body unless the condition holds
#[macro_export]
macro_rules! ensure_that {
    ($cond:expr) => {
        if !$cond {
            return $crate::fail(concat!("expected `", stringify!($cond), "`"));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return $crate::fail(format!($($arg)+));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(value: i32) -> Outcome {
        ensure_that!(value > 0);
        ensure_that!(value < 10, "{value} is too large");
        Ok(())
    }

    #[test]
    fn test_signal_kinds() {
        assert_eq!(pending("later").unwrap_err().kind(), "pending");
        assert_eq!(skip("no").unwrap_err().kind(), "skipped");
        assert!(fail("boom").unwrap_err().is_failure());
    }

    #[test]
    fn test_anyhow_converts_to_failure() {
        let signal: Signal = anyhow::anyhow!("io went away").into();
        match signal {
            Signal::Failure(failure) => {
                assert_eq!(failure.kind(), "error");
                assert_eq!(failure.to_string(), "io went away");
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[test]
    fn test_ensure_that_messages() {
        assert!(checks(3).is_ok());

        let err = checks(0).unwrap_err();
        assert_eq!(err.to_string(), "expected `value > 0`");

        let err = checks(12).unwrap_err();
        assert_eq!(err.to_string(), "12 is too large");
    }

    #[test]
    fn test_context_hook_error_display() {
        let err = ContextHookError::new("Suite", HookPhase::BeforeContext, fail("db down").unwrap_err());
        assert_eq!(err.to_string(), "beforeContext hook of `Suite` failed: db down");
    }
}
