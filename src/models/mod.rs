//! Spec tree and result models
//!
//! Groups own their children and hooks; nothing holds a pointer back up the
//! tree. Ancestry during a run is carried by `executor::frame::Frame`.

mod example;
mod group;
mod hook;
mod node;
mod report;

pub use example::{Example, ExampleStatus};
pub use group::ExampleGroup;
pub use hook::{Hook, HookPhase, Hooks};
pub use node::{Child, Node, NodeRef};
pub use report::{ExampleReport, GroupFailure, RunSummary};
