//! Group execution
//!
//! Sequential runs walk the tree depth-first in registration order. A root
//! activation may instead fan its direct children out to forked workers; see
//! [`ExampleGroup::run`] for when that happens and what the coordinator can
//! observe afterwards.

use std::rc::Rc;

use tracing::{debug, error, info, warn};

use super::frame::Frame;
use super::parallel::{partition, Forked, WorkerPool};
use super::trap::PanicTrap;
use crate::error::{ContextHookError, Outcome, Signal};
use crate::models::{Child, Example, ExampleGroup, ExampleReport, HookPhase};
use crate::reporter::Reporter;

/// Which process a root activation returned in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// The process that started the run
    Coordinator,
    /// A forked worker that finished its slice; it must exit, not continue
    Worker { index: usize },
}

impl Activation {
    pub fn is_worker(&self) -> bool {
        matches!(self, Activation::Worker { .. })
    }
}

impl ExampleGroup {
    /// Run this group as the root of an execution
    ///
    /// With a filter active anywhere in the tree, or a pool that is disabled
    /// or already used, the run is sequential and every outcome lands in
    /// `reporter`. Otherwise the direct children are split across forked
    /// workers. Workers record into their own copy of the reporter, so the
    /// coordinator's lists stay empty for forked children and only the
    /// failure latch reflects worker exit statuses.
    ///
    /// A failing `beforeContext` or `afterContext` hook is returned as an
    /// error after abandoning the rest of the run.
    pub fn run(
        &mut self,
        reporter: &mut Reporter,
        pool: &WorkerPool,
    ) -> Result<Activation, ContextHookError> {
        self.activate(reporter, pool, None, false)
    }

    pub(crate) fn activate(
        &mut self,
        reporter: &mut Reporter,
        pool: &WorkerPool,
        parent: Option<&Frame<'_>>,
        parent_has_only: bool,
    ) -> Result<Activation, ContextHookError> {
        if parent_has_only || self.has_only() {
            debug!("`{}` is filtered, running sequentially", self.title);
        } else if parent.is_none() && pool.should_fork() {
            return self.run_forked(reporter, pool);
        }
        self.run_sequential(reporter, pool, parent, parent_has_only)?;
        Ok(Activation::Coordinator)
    }

    fn run_sequential(
        &mut self,
        reporter: &mut Reporter,
        pool: &WorkerPool,
        parent: Option<&Frame<'_>>,
        parent_has_only: bool,
    ) -> Result<(), ContextHookError> {
        let _trap = PanicTrap::install();
        let depth = parent.map_or(0, |p| p.depth() + 1);
        reporter.group_started(&self.title, depth);
        self.timing.start();

        let filtering = parent_has_only || self.descendant_only;
        let result = {
            let Self {
                title,
                context,
                children,
                hooks,
                ..
            } = self;
            let mut scope = context.derive();
            if let Some(parent) = parent {
                scope.set_parent_context(Rc::clone(&parent.scope));
            }
            let scope = Rc::new(scope);
            let frame = match parent {
                Some(parent) => parent.nested(title, hooks, scope),
                None => Frame::root(title, hooks, scope),
            };

            before_context(&frame)
                .and_then(|()| run_each(&frame, children, reporter, pool, filtering))
                .and_then(|()| after_context(&frame))
        };

        self.timing.stop();
        reporter.group_finished(&self.title, self.timing.elapsed_ms());
        result
    }

    fn run_forked(
        &mut self,
        reporter: &mut Reporter,
        pool: &WorkerPool,
    ) -> Result<Activation, ContextHookError> {
        let _trap = PanicTrap::install();
        reporter.group_started(&self.title, 0);
        self.timing.start();

        let result = {
            let Self {
                title,
                context,
                children,
                hooks,
                ..
            } = self;
            let frame = Frame::root(title, hooks, Rc::new(context.derive()));
            fan_out(&frame, children, reporter, pool)
        };

        self.timing.stop();
        reporter.group_finished(&self.title, self.timing.elapsed_ms());
        result
    }
}

fn before_context(frame: &Frame<'_>) -> Result<(), ContextHookError> {
    frame
        .run_hooks(HookPhase::BeforeContext, &frame.scope)
        .map_err(|signal| ContextHookError::new(frame.title, HookPhase::BeforeContext, signal))
}

fn after_context(frame: &Frame<'_>) -> Result<(), ContextHookError> {
    frame
        .run_hooks(HookPhase::AfterContext, &frame.scope)
        .map_err(|signal| ContextHookError::new(frame.title, HookPhase::AfterContext, signal))
}

fn run_each(
    frame: &Frame<'_>,
    children: &mut [Child],
    reporter: &mut Reporter,
    pool: &WorkerPool,
    filtering: bool,
) -> Result<(), ContextHookError> {
    for child in children.iter_mut() {
        if filtering && !child.has_only() {
            debug!("not selected: {}", child.title());
            continue;
        }
        match child {
            Child::Example(example) => run_example(frame, example, reporter),
            Child::Group(group) => {
                // Below an explicitly marked group everything runs.
                let inherited = filtering && !group.is_only();
                group.activate(reporter, pool, Some(frame), inherited)?;
            }
        }
    }
    Ok(())
}

fn run_example(frame: &Frame<'_>, example: &mut Example, reporter: &mut Reporter) {
    reporter.example_started(example.title());
    example.timing_mut().start();

    let context = frame.scope.child();
    let primary = frame
        .run_hooks(HookPhase::BeforeEach, &context)
        .and_then(|()| example.run(&context));
    let teardown = frame.run_hooks(HookPhase::AfterEach, &context);
    let outcome = settle(primary, teardown);

    example.timing_mut().stop();
    let path = frame.path();
    match outcome {
        Ok(()) => {
            example.passed();
            reporter.example_passed(ExampleReport::from_example(example, path));
        }
        Err(Signal::Pending(message)) => {
            example.pending(message);
            reporter.example_pending(ExampleReport::from_example(example, path));
        }
        Err(Signal::Skipped(message)) => {
            example.skipped(message);
            reporter.example_skipped(ExampleReport::from_example(example, path));
        }
        Err(Signal::Failure(failure)) => {
            example.failed(failure);
            reporter.example_failed(ExampleReport::from_example(example, path));
        }
    }
    debug!("{} {}", example.status(), example.title());
    reporter.example_finished(example.title());
}

/// Combine the setup-and-body result with the teardown result
///
/// A failure anywhere wins, the earlier one first. Otherwise a pending or
/// skip signal from setup or body stands over anything teardown reports.
fn settle(primary: Outcome, teardown: Outcome) -> Outcome {
    match (primary, teardown) {
        (Err(signal), _) if signal.is_failure() => Err(signal),
        (_, Err(signal)) if signal.is_failure() => Err(signal),
        (Err(signal), _) => Err(signal),
        (Ok(()), teardown) => teardown,
    }
}

/// Run the root's direct children across forked workers
///
/// `beforeContext` runs once here, before any fork, so every worker starts
/// from the prepared scope. Each worker clears the reporter state it
/// inherited, runs its slice followed by `afterContext`, and returns
/// [`Activation::Worker`]. A slice whose fork fails runs in this process the
/// same way. Once such an in-process slice fails, later slices that also
/// cannot be forked are abandoned; its error is returned after every
/// worker has been waited for.
fn fan_out(
    frame: &Frame<'_>,
    children: &mut [Child],
    reporter: &mut Reporter,
    pool: &WorkerPool,
) -> Result<Activation, ContextHookError> {
    fan_out_with(frame, children, reporter, pool, || pool.fork_worker())
}

fn fan_out_with<F>(
    frame: &Frame<'_>,
    children: &mut [Child],
    reporter: &mut Reporter,
    pool: &WorkerPool,
    mut fork: F,
) -> Result<Activation, ContextHookError>
where
    F: FnMut() -> anyhow::Result<Forked>,
{
    before_context(frame)?;

    if children.len() < 2 {
        debug!("`{}` has fewer than two children, not forking", frame.title);
        run_slice(frame, children, reporter, pool)?;
        return Ok(Activation::Coordinator);
    }

    let slices = partition(children.len(), pool.workers());
    pool.mark_fanned_out();
    reporter.mark_forked();
    reporter.flush();
    info!(
        "forking {} workers for {} children of `{}`",
        slices.len(),
        children.len(),
        frame.title
    );

    let mut handles = Vec::with_capacity(slices.len());
    let mut fallback_error: Option<ContextHookError> = None;
    for (index, range) in slices.into_iter().enumerate() {
        match fork() {
            Ok(Forked::Worker) => {
                reporter.begin_worker();
                if let Err(err) = run_slice(frame, &mut children[range], reporter, pool) {
                    error!("worker {}: {}", index, err);
                    reporter.group_failed(&err);
                }
                return Ok(Activation::Worker { index });
            }
            Ok(Forked::Coordinator(handle)) => {
                debug!("worker {} started as pid {}", index, handle.pid);
                handles.push(handle);
            }
            Err(e) => {
                if let Some(err) = &fallback_error {
                    warn!("{:#}; abandoning slice {} after {}", e, index, err);
                    continue;
                }
                warn!("{:#}; running slice {} in this process", e, index);
                if let Err(err) = run_slice(frame, &mut children[range], reporter, pool) {
                    fallback_error = Some(err);
                }
            }
        }
    }

    let exits = pool.wait_all(handles);
    let mut failed = 0;
    for failure in exits.iter().filter_map(|exit| exit.failure()) {
        warn!("{}", failure);
        failed += 1;
    }
    if failed > 0 {
        reporter.latch_failure();
    }
    info!("{} workers finished, {} failed", exits.len(), failed);

    match fallback_error {
        Some(err) => Err(err),
        None => Ok(Activation::Coordinator),
    }
}

/// One share of the root's children followed by the root's `afterContext`
fn run_slice(
    frame: &Frame<'_>,
    slice: &mut [Child],
    reporter: &mut Reporter,
    pool: &WorkerPool,
) -> Result<(), ContextHookError> {
    run_each(frame, slice, reporter, pool, false)?;
    after_context(frame)
}
