//! Hook models
//!
//! Setup and teardown actions bound to one of four phases.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::Context;
use crate::error::Outcome;
use crate::executor::guarded;

pub(crate) type Body = Box<dyn Fn(&Context) -> Outcome>;

/// Phase a hook runs in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPhase {
    BeforeContext,
    AfterContext,
    BeforeEach,
    AfterEach,
}

impl HookPhase {
    pub fn name(&self) -> &'static str {
        match self {
            HookPhase::BeforeContext => "beforeContext",
            HookPhase::AfterContext => "afterContext",
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::AfterEach => "afterEach",
        }
    }

    /// Teardown phases run innermost-first
    pub fn is_teardown(&self) -> bool {
        matches!(self, HookPhase::AfterContext | HookPhase::AfterEach)
    }

    /// Per-example phases walk the whole ancestor chain
    pub fn is_per_example(&self) -> bool {
        matches!(self, HookPhase::BeforeEach | HookPhase::AfterEach)
    }

    pub fn all() -> [HookPhase; 4] {
        [
            HookPhase::BeforeContext,
            HookPhase::AfterContext,
            HookPhase::BeforeEach,
            HookPhase::AfterEach,
        ]
    }

    pub fn from_str(s: &str) -> Option<HookPhase> {
        HookPhase::all().into_iter().find(|p| p.name() == s)
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A phase-bound action, immutable once built
pub struct Hook {
    phase: HookPhase,
    body: Body,
}

impl Hook {
    pub fn new<F>(phase: HookPhase, body: F) -> Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        Self {
            phase,
            body: Box::new(body),
        }
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    /// Run the hook body, trapping panics
    pub fn run(&self, context: &Context) -> Outcome {
        guarded(|| (self.body)(context))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("phase", &self.phase).finish()
    }
}

/// Ordered hook lists of one group
#[derive(Debug, Default)]
pub struct Hooks {
    before_context: Vec<Hook>,
    after_context: Vec<Hook>,
    before_each: Vec<Hook>,
    after_each: Vec<Hook>,
}

impl Hooks {
    pub fn add(&mut self, hook: Hook) {
        match hook.phase {
            HookPhase::BeforeContext => self.before_context.push(hook),
            HookPhase::AfterContext => self.after_context.push(hook),
            HookPhase::BeforeEach => self.before_each.push(hook),
            HookPhase::AfterEach => self.after_each.push(hook),
        }
    }

    /// Hooks of a phase in registration order
    pub fn get(&self, phase: HookPhase) -> &[Hook] {
        match phase {
            HookPhase::BeforeContext => &self.before_context,
            HookPhase::AfterContext => &self.after_context,
            HookPhase::BeforeEach => &self.before_each,
            HookPhase::AfterEach => &self.after_each,
        }
    }

    pub fn len(&self) -> usize {
        HookPhase::all().iter().map(|p| self.get(*p).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(HookPhase::BeforeEach.to_string(), "beforeEach");
        assert_eq!(HookPhase::from_str("afterContext"), Some(HookPhase::AfterContext));
        assert_eq!(HookPhase::from_str("beforeAll"), None);
    }

    #[test]
    fn test_phase_direction() {
        assert!(HookPhase::AfterEach.is_teardown());
        assert!(!HookPhase::BeforeContext.is_teardown());
        assert!(HookPhase::BeforeEach.is_per_example());
        assert!(!HookPhase::AfterContext.is_per_example());
    }

    #[test]
    fn test_hooks_bucketed_by_phase() {
        let mut hooks = Hooks::default();
        hooks.add(Hook::new(HookPhase::BeforeEach, |_| Ok(())));
        hooks.add(Hook::new(HookPhase::BeforeEach, |_| Ok(())));
        hooks.add(Hook::new(HookPhase::AfterContext, |_| Ok(())));

        assert_eq!(hooks.get(HookPhase::BeforeEach).len(), 2);
        assert_eq!(hooks.get(HookPhase::AfterContext).len(), 1);
        assert!(hooks.get(HookPhase::AfterEach).is_empty());
        assert_eq!(hooks.len(), 3);
    }

    #[test]
    fn test_hook_panic_is_trapped() {
        let hook = Hook::new(HookPhase::BeforeEach, |_| panic!("setup exploded"));
        let err = hook.run(&Context::new()).unwrap_err();
        assert!(err.is_failure());
        assert!(err.to_string().contains("setup exploded"));
    }
}
