//! Engine events and notification sinks
//!
//! Sinks only observe. A missing or failing sink never changes what the
//! reporter records.

use anyhow::{Context, Result};
use serde::Serialize;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::models::{ExampleReport, GroupFailure};

/// Typed notification emitted by the engine
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    UnitLoading {
        unit: String,
    },
    GroupStarted {
        title: String,
        depth: usize,
    },
    GroupFinished {
        title: String,
        duration_ms: u64,
    },
    GroupFailed(GroupFailure),
    ExampleStarted {
        title: String,
    },
    ExampleFinished {
        title: String,
    },
    ExamplePassed(ExampleReport),
    ExampleFailed(ExampleReport),
    ExamplePending(ExampleReport),
    ExampleSkipped(ExampleReport),
    WorkerFinished {
        index: usize,
        passed: usize,
        failed: usize,
        pending: usize,
        skipped: usize,
        has_failure: bool,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UnitLoading { .. } => "unit_loading",
            Event::GroupStarted { .. } => "group_started",
            Event::GroupFinished { .. } => "group_finished",
            Event::GroupFailed(_) => "group_failed",
            Event::ExampleStarted { .. } => "example_started",
            Event::ExampleFinished { .. } => "example_finished",
            Event::ExamplePassed(_) => "example_passed",
            Event::ExampleFailed(_) => "example_failed",
            Event::ExamplePending(_) => "example_pending",
            Event::ExampleSkipped(_) => "example_skipped",
            Event::WorkerFinished { .. } => "worker_finished",
        }
    }
}

/// Receiver of engine events
pub trait EventSink {
    fn notify(&self, event: &Event) -> Result<()>;

    /// Push out anything buffered; called before forking and before a worker exits
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every event in memory; clones share the same buffer
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(Event::name).collect()
    }
}

impl EventSink for MemorySink {
    fn notify(&self, event: &Event) -> Result<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

/// Forwards events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &Event) -> Result<()> {
        match event {
            Event::ExamplePassed(r)
            | Event::ExampleFailed(r)
            | Event::ExamplePending(r)
            | Event::ExampleSkipped(r) => info!("{}", r),
            Event::GroupFailed(f) => warn!("{} {} failed: {}", f.group, f.phase, f.message),
            Event::WorkerFinished {
                index,
                passed,
                failed,
                ..
            } => info!("worker {} finished: {} passed, {} failed", index, passed, failed),
            other => debug!("{}", other.name()),
        }
        Ok(())
    }
}

/// Line-delimited JSON written to an append-mode file
///
/// Every event is one `write_all` of a complete line, so forked workers that
/// inherited the descriptor interleave whole lines.
#[derive(Debug)]
pub struct JsonLinesSink {
    file: RefCell<File>,
}

#[derive(Serialize)]
struct Line<'a> {
    pid: u32,
    #[serde(flatten)]
    event: &'a Event,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open event file {}", path.display()))?;
        Ok(Self {
            file: RefCell::new(file),
        })
    }
}

impl EventSink for JsonLinesSink {
    fn notify(&self, event: &Event) -> Result<()> {
        let mut line = serde_json::to_vec(&Line {
            pid: std::process::id(),
            event,
        })
        .context("Failed to serialize event")?;
        line.push(b'\n');
        self.file
            .borrow_mut()
            .write_all(&line)
            .context("Failed to write event")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.file.borrow_mut().flush().context("Failed to flush event file")
    }
}
