//! Run-time ancestry
//!
//! A [`Frame`] exists while a group is executing. It borrows the group's title
//! and hooks and owns the group's live scope, and links to the enclosing
//! group's frame. Hook traversal walks these links instead of parent pointers
//! stored in the tree.

use std::rc::Rc;

use tracing::trace;

use crate::context::Context;
use crate::error::Outcome;
use crate::models::{HookPhase, Hooks};

pub(crate) struct Frame<'a> {
    pub title: &'a str,
    pub hooks: &'a Hooks,
    pub scope: Rc<Context>,
    pub parent: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    pub fn root(title: &'a str, hooks: &'a Hooks, scope: Rc<Context>) -> Self {
        Self {
            title,
            hooks,
            scope,
            parent: None,
        }
    }

    pub fn nested(&'a self, title: &'a str, hooks: &'a Hooks, scope: Rc<Context>) -> Frame<'a> {
        Frame {
            title,
            hooks,
            scope,
            parent: Some(self),
        }
    }

    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }

    /// Group titles from the outermost frame down to this one
    pub fn path(&self) -> Vec<String> {
        let mut path = self.parent.map(Frame::path).unwrap_or_default();
        path.push(self.title.to_string());
        path
    }

    /// Run a phase's hooks against `context`
    ///
    /// Setup phases run in registration order, teardown phases
    /// last-registered-first. Per-example phases also walk the ancestors:
    /// outermost first for setup, innermost first for teardown. The first
    /// failing hook stops the phase.
    pub fn run_hooks(&self, phase: HookPhase, context: &Context) -> Outcome {
        let parent = self.parent.filter(|_| phase.is_per_example());
        let hooks = self.hooks.get(phase);

        if phase.is_teardown() {
            for hook in hooks.iter().rev() {
                trace!("{} {}", self.title, phase);
                hook.run(context)?;
            }
            if let Some(parent) = parent {
                parent.run_hooks(phase, context)?;
            }
        } else {
            if let Some(parent) = parent {
                parent.run_hooks(phase, context)?;
            }
            for hook in hooks {
                trace!("{} {}", self.title, phase);
                hook.run(context)?;
            }
        }
        Ok(())
    }
}
