//! Outcome reporter
//!
//! Accumulates classified example reports and forwards typed events to an
//! optional sink. Lists are updated before the sink is tried.

mod events;

pub use events::{Event, EventSink, JsonLinesSink, MemorySink, TracingSink};

use tracing::warn;

use crate::error::ContextHookError;
use crate::models::{ExampleReport, GroupFailure, RunSummary};

/// Run-wide outcome aggregator
#[derive(Default)]
pub struct Reporter {
    passes: Vec<ExampleReport>,
    failures: Vec<ExampleReport>,
    pending: Vec<ExampleReport>,
    skipped: Vec<ExampleReport>,
    results: Vec<ExampleReport>,
    group_failures: Vec<GroupFailure>,
    has_failure: bool,
    forked: bool,
    sink: Option<Box<dyn EventSink>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Box<dyn EventSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    fn dispatch(&self, event: Event) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.notify(&event) {
                warn!("event sink rejected {}: {:#}", event.name(), e);
            }
        }
    }

    pub fn flush(&self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.flush() {
                warn!("event sink flush failed: {:#}", e);
            }
        }
    }

    pub fn example_passed(&mut self, report: ExampleReport) {
        self.passes.push(report.clone());
        self.results.push(report.clone());
        self.dispatch(Event::ExamplePassed(report));
    }

    pub fn example_failed(&mut self, report: ExampleReport) {
        self.has_failure = true;
        self.failures.push(report.clone());
        self.results.push(report.clone());
        self.dispatch(Event::ExampleFailed(report));
    }

    pub fn example_pending(&mut self, report: ExampleReport) {
        self.pending.push(report.clone());
        self.results.push(report.clone());
        self.dispatch(Event::ExamplePending(report));
    }

    pub fn example_skipped(&mut self, report: ExampleReport) {
        self.skipped.push(report.clone());
        self.results.push(report.clone());
        self.dispatch(Event::ExampleSkipped(report));
    }

    /// A context-level hook failed; no example owns the failure
    pub fn group_failed(&mut self, err: &ContextHookError) {
        self.has_failure = true;
        let failure = GroupFailure::from(err);
        self.group_failures.push(failure.clone());
        self.dispatch(Event::GroupFailed(failure));
    }

    pub fn group_started(&self, title: &str, depth: usize) {
        self.dispatch(Event::GroupStarted {
            title: title.to_string(),
            depth,
        });
    }

    pub fn group_finished(&self, title: &str, duration_ms: u64) {
        self.dispatch(Event::GroupFinished {
            title: title.to_string(),
            duration_ms,
        });
    }

    pub fn example_started(&self, title: &str) {
        self.dispatch(Event::ExampleStarted {
            title: title.to_string(),
        });
    }

    pub fn example_finished(&self, title: &str) {
        self.dispatch(Event::ExampleFinished {
            title: title.to_string(),
        });
    }

    pub fn unit_loading(&self, unit: &str) {
        self.dispatch(Event::UnitLoading {
            unit: unit.to_string(),
        });
    }

    pub(crate) fn worker_finished(&self, index: usize) {
        self.dispatch(Event::WorkerFinished {
            index,
            passed: self.passes.len(),
            failed: self.failures.len(),
            pending: self.pending.len(),
            skipped: self.skipped.len(),
            has_failure: self.has_failure,
        });
    }

    /// Set the failure latch; only [`Reporter::begin_worker`] clears it
    pub fn latch_failure(&mut self) {
        self.has_failure = true;
    }

    pub fn has_failure(&self) -> bool {
        self.has_failure
    }

    pub(crate) fn mark_forked(&mut self) {
        self.forked = true;
    }

    /// Drop everything recorded before a fork
    ///
    /// A worker reports on its own slice only. The sink and the forked flag
    /// are kept.
    pub(crate) fn begin_worker(&mut self) {
        self.passes.clear();
        self.failures.clear();
        self.pending.clear();
        self.skipped.clear();
        self.results.clear();
        self.group_failures.clear();
        self.has_failure = false;
    }

    /// Whether this process fanned examples out to workers
    pub fn forked(&self) -> bool {
        self.forked
    }

    pub fn passes(&self) -> &[ExampleReport] {
        &self.passes
    }

    pub fn failures(&self) -> &[ExampleReport] {
        &self.failures
    }

    pub fn pending(&self) -> &[ExampleReport] {
        &self.pending
    }

    pub fn skipped(&self) -> &[ExampleReport] {
        &self.skipped
    }

    /// Every classified report in execution order
    pub fn results(&self) -> &[ExampleReport] {
        &self.results
    }

    pub fn group_failures(&self) -> &[GroupFailure] {
        &self.group_failures
    }

    pub fn summary(&self, duration_ms: u64) -> RunSummary {
        RunSummary {
            total: self.results.len(),
            passed: self.passes.len(),
            failed: self.failures.len(),
            pending: self.pending.len(),
            skipped: self.skipped.len(),
            group_failures: self.group_failures.clone(),
            duration_ms,
            has_failure: self.has_failure,
            forked: self.forked,
            results: self.results.clone(),
        }
    }
}
