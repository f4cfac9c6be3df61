//! Spec execution engine
//!
//! Provides sequential and forked execution of example groups.

mod frame;
mod group;
mod parallel;
mod runner;
mod trap;

pub use group::Activation;
pub use parallel::{
    partition, ExitState, Forked, WorkerExit, WorkerHandle, WorkerPool, DEFAULT_WORKERS,
};
pub use runner::Runner;
pub use trap::{guarded, is_active as panic_trap_active, PanicTrap};
