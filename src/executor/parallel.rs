//! Forked worker processes
//!
//! Workers are OS processes created with `fork()`: each one starts from a
//! copy-on-write snapshot of the coordinator, so nothing it records is visible
//! to the coordinator except its exit status (and whatever it writes to an
//! inherited event sink).

use anyhow::Result;
use std::cell::Cell;
use std::io::Write;
use std::ops::Range;
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Failure;

/// Default number of workers when none is configured
pub const DEFAULT_WORKERS: usize = 2;

/// Result of a fork from the caller's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Forked {
    /// This process is the new worker
    Worker,
    /// This process is the coordinator; the worker has this handle
    Coordinator(WorkerHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerHandle {
    pub pid: i32,
}

/// How a worker ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitState {
    Code(i32),
    Signaled(i32),
    /// The status could not be collected
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerExit {
    pub pid: i32,
    pub state: ExitState,
}

impl WorkerExit {
    pub fn success(&self) -> bool {
        self.state == ExitState::Code(0)
    }

    /// Why the worker counts as failed, if it does
    pub fn failure(&self) -> Option<Failure> {
        match self.state {
            ExitState::Code(0) => None,
            ExitState::Code(code) => Some(Failure::Message(format!(
                "worker {} exited with status {}",
                self.pid, code
            ))),
            ExitState::Signaled(signal) => Some(Failure::Message(format!(
                "worker {} was killed by signal {}",
                self.pid, signal
            ))),
            ExitState::Lost => Some(Failure::WorkerLost(self.pid)),
        }
    }
}

/// Fan-out policy and bookkeeping for one run
#[derive(Debug)]
pub struct WorkerPool {
    enabled: bool,
    workers: usize,
    poll_interval: Duration,
    fanned_out: Cell<bool>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            enabled: true,
            workers: if workers == 0 { DEFAULT_WORKERS } else { workers },
            poll_interval: Duration::from_millis(10),
            fanned_out: Cell::new(false),
        }
    }

    /// A pool that never forks
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(DEFAULT_WORKERS)
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let pool = if config.fork {
            Self::new(config.workers())
        } else {
            Self::disabled()
        };
        pool.with_poll_interval(Duration::from_millis(config.poll_interval_ms))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Forking is opted in, supported here, and has not happened yet
    pub fn should_fork(&self) -> bool {
        self.enabled && cfg!(unix) && !self.fanned_out.get()
    }

    pub fn has_fanned_out(&self) -> bool {
        self.fanned_out.get()
    }

    pub(crate) fn mark_fanned_out(&self) {
        self.fanned_out.set(true);
    }

    /// Fork one worker process
    pub fn fork_worker(&self) -> Result<Forked> {
        // Anything buffered now would be written twice.
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        sys::spawn_worker()
    }

    /// Poll until every worker has exited
    ///
    /// Each pass checks every outstanding worker without blocking, then
    /// sleeps for the poll interval.
    pub fn wait_all(&self, workers: Vec<WorkerHandle>) -> Vec<WorkerExit> {
        let mut outstanding = workers;
        let mut exits = Vec::with_capacity(outstanding.len());

        while !outstanding.is_empty() {
            outstanding.retain(|worker| match sys::try_wait(*worker) {
                Some(state) => {
                    debug!("worker {} exited: {:?}", worker.pid, state);
                    exits.push(WorkerExit {
                        pid: worker.pid,
                        state,
                    });
                    false
                }
                None => true,
            });
            if !outstanding.is_empty() {
                thread::sleep(self.poll_interval);
            }
        }

        exits
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Split `len` items into at most `workers` contiguous, near-equal ranges
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let size = len.div_ceil(workers);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

#[cfg(unix)]
mod sys {
    use anyhow::{anyhow, Result};
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    use nix::unistd::{fork, ForkResult, Pid};
    use tracing::warn;

    use super::{ExitState, Forked, WorkerHandle};

    pub fn spawn_worker() -> Result<Forked> {
        // SAFETY: the worker only continues the single-threaded spec run it
        // was forked from and then exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => Ok(Forked::Worker),
            Ok(ForkResult::Parent { child }) => Ok(Forked::Coordinator(WorkerHandle {
                pid: child.as_raw(),
            })),
            Err(errno) => Err(anyhow!("fork failed: {errno}")),
        }
    }

    pub fn try_wait(worker: WorkerHandle) -> Option<ExitState> {
        match waitpid(Pid::from_raw(worker.pid), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Some(ExitState::Code(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => Some(ExitState::Signaled(signal as i32)),
            Ok(_) => None,
            Err(errno) => {
                warn!("waitpid({}) failed: {}", worker.pid, errno);
                Some(ExitState::Lost)
            }
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use anyhow::{bail, Result};

    use super::{ExitState, Forked, WorkerHandle};

    pub fn spawn_worker() -> Result<Forked> {
        bail!("worker processes need a unix host")
    }

    pub fn try_wait(_worker: WorkerHandle) -> Option<ExitState> {
        Some(ExitState::Lost)
    }
}
