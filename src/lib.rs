//! dspec - behavior-driven spec execution engine
//!
//! Spec trees are built from nested example groups, each with lazily
//! resolved fixtures and four kinds of hooks. A run walks the tree
//! depth-first, classifies every example as passed, failed, pending or
//! skipped, and latches a run-wide failure flag.
//!
//! ## Features
//!
//! - Lazy, per-example memoized fixtures with lexical fallthrough
//! - `beforeContext`/`afterContext`/`beforeEach`/`afterEach` hooks
//! - Focused runs: marking examples or groups `only` restricts the run
//! - Optional fan-out of root examples to forked worker processes
//! - Typed engine events with in-memory, tracing and JSON-lines sinks
//!
//! ## Usage
//!
//! ```
//! use dspec::{pending, unit, EngineConfig, Runner};
//!
//! let units = vec![unit("stack", |s| {
//!     s.describe("Vec", |s| {
//!         s.let_fixture("items", |_| vec![1, 2, 3]);
//!         s.it("has a length", |ctx| {
//!             dspec::ensure_that!(ctx.get::<Vec<i32>>("items")?.len() == 3);
//!             Ok(())
//!         });
//!         s.it("sorts", |_| pending("not written yet"));
//!     });
//! })];
//!
//! let mut runner = Runner::new(EngineConfig::default()).unwrap();
//! let summary = runner.load(&units).run();
//! assert_eq!(summary.passed, 1);
//! assert_eq!(summary.pending, 1);
//! assert_eq!(runner.exit_code(), 0);
//! ```

pub mod config;
pub mod context;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod models;
pub mod reporter;
pub mod utils;

pub use config::{EngineConfig, EnvConfig};
pub use context::{Context, Fixture};
pub use dsl::{unit, FnUnit, SpecBuilder, SpecUnit};
pub use error::{fail, pending, skip, BuildError, ContextHookError, Failure, Outcome, Signal};
pub use executor::{Activation, Runner, WorkerPool};
pub use models::{
    Example, ExampleGroup, ExampleReport, ExampleStatus, Hook, HookPhase, Node, RunSummary,
};
pub use reporter::{Event, EventSink, JsonLinesSink, MemorySink, Reporter, TracingSink};
