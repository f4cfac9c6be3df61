//! Run driver
//!
//! Owns the root group, the reporter and the worker pool for one execution.

use anyhow::Result;
use std::io::Write;
use std::process;
use tracing::{error, info};

use super::group::Activation;
use super::parallel::WorkerPool;
use crate::config::EngineConfig;
use crate::dsl::{SpecBuilder, SpecUnit};
use crate::models::{ExampleGroup, RunSummary};
use crate::reporter::{EventSink, JsonLinesSink, Reporter, TracingSink};
use crate::utils::Timing;

/// Spec runner
pub struct Runner {
    config: EngineConfig,
    root: ExampleGroup,
    reporter: Reporter,
    pool: WorkerPool,
}

impl Runner {
    /// Create a runner
    ///
    /// Events go to the configured event file, or to the log when there is
    /// none.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let sink: Box<dyn EventSink> = match &config.events_file {
            Some(path) => Box::new(JsonLinesSink::open(path)?),
            None => Box::new(TracingSink),
        };
        let reporter = Reporter::with_sink(sink);
        Ok(Self {
            root: ExampleGroup::new(config.suite_title.clone()),
            pool: WorkerPool::from_config(&config),
            reporter,
            config,
        })
    }

    /// Replace the event sink
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.reporter.set_sink(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append the definitions of each unit to the root group
    pub fn load(&mut self, units: &[Box<dyn SpecUnit>]) -> &mut Self {
        let root = std::mem::replace(&mut self.root, ExampleGroup::new(""));
        self.root = SpecBuilder::load(units, root, &self.reporter);
        self
    }

    pub fn root(&self) -> &ExampleGroup {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ExampleGroup {
        &mut self.root
    }

    /// Execute the tree
    ///
    /// In a forked worker this never returns: the worker reports its own
    /// totals and exits with status 1 if it saw a failure.
    pub fn run(&mut self) -> RunSummary {
        let mut timing = Timing::default();
        timing.start();
        info!(
            "Running {} examples in `{}`",
            self.root.total(),
            self.root.title()
        );

        match self.root.run(&mut self.reporter, &self.pool) {
            Ok(Activation::Worker { index }) => self.finish_worker(index),
            Ok(Activation::Coordinator) => {}
            Err(err) => {
                error!("{}", err);
                self.reporter.group_failed(&err);
            }
        }
        self.reporter.flush();
        timing.stop();

        let summary = self.reporter.summary(timing.elapsed_ms());
        info!(
            "Run completed in {}ms - Pass: {}/{} ({:.1}%)",
            summary.duration_ms,
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        summary
    }

    fn finish_worker(&self, index: usize) -> ! {
        self.reporter.worker_finished(index);
        self.reporter.flush();
        let _ = std::io::stdout().flush();
        let code = i32::from(self.reporter.has_failure());
        info!("worker {} exiting with status {}", index, code);
        process::exit(code)
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn has_failure(&self) -> bool {
        self.reporter.has_failure()
    }

    /// Process exit status for the run
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::unit;
    use crate::error::fail;
    use crate::reporter::MemorySink;

    fn units() -> Vec<Box<dyn SpecUnit>> {
        vec![
            unit("passing", |s| {
                s.describe("numbers", |s| {
                    s.it("adds", |_| Ok(()));
                    s.it_pending("divides");
                });
            }),
            unit("failing", |s| {
                s.it("breaks", |_| fail("nope"));
            }),
        ]
    }

    #[test]
    fn test_sequential_run() {
        let sink = MemorySink::new();
        let mut runner = Runner::new(EngineConfig::default())
            .unwrap()
            .with_sink(Box::new(sink.clone()));
        runner.load(&units());
        assert_eq!(runner.root().title(), "Suite");
        assert_eq!(runner.root().total(), 3);

        let summary = runner.run();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.forked);
        assert!(runner.has_failure());
        assert_eq!(runner.exit_code(), 1);
        assert_eq!(sink.names()[..2].to_vec(), vec!["unit_loading", "unit_loading"]);
    }

    #[test]
    fn test_clean_run_exits_zero() {
        let mut runner = Runner::new(EngineConfig::default()).unwrap();
        assert!(runner.reporter().has_sink());
        runner.load(&[unit("ok", |s| {
            s.it("works", |_| Ok(()));
        })]);
        let summary = runner.run();
        assert!(summary.is_success());
        assert_eq!(runner.exit_code(), 0);
    }

    #[test]
    fn test_context_hook_failure_recorded() {
        let mut runner = Runner::new(EngineConfig::default()).unwrap();
        runner.load(&[unit("db", |s| {
            s.describe("database", |s| {
                s.before_context(|_| fail("connection refused"));
                s.it("queries", |_| Ok(()));
            });
        })]);

        let summary = runner.run();
        assert!(summary.has_failure);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.group_failures.len(), 1);
        assert_eq!(summary.group_failures[0].group, "database");
        assert_eq!(runner.exit_code(), 1);
    }

    #[test]
    fn test_suite_title_from_config() {
        let config = EngineConfig {
            suite_title: "Everything".to_string(),
            ..Default::default()
        };
        let mut runner = Runner::new(config).unwrap();
        runner.load(&units());
        assert_eq!(runner.root().title(), "Everything");
        assert!(!runner.pool().is_enabled());
    }

    #[test]
    fn test_events_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let config = EngineConfig {
            events_file: Some(path.clone()),
            ..Default::default()
        };
        let mut runner = Runner::new(config).unwrap();
        runner.load(&units());
        runner.run();

        let content = std::fs::read_to_string(&path).unwrap();
        let failed = content
            .lines()
            .filter(|l| l.contains(r#""event":"example_failed""#))
            .count();
        assert_eq!(failed, 1);
    }
}
