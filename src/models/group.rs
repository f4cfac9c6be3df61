//! Example group model
//!
//! Construction, only-marking and aggregate queries. Execution lives in
//! `executor::group`.

use std::fmt;

use super::node::{Child, Node, NodeRef};
use super::{Example, Hook, HookPhase, Hooks};
use crate::context::Context;
use crate::error::BuildError;
use crate::utils::Timing;

/// Named composite node owning examples, nested groups, hooks and a scope
pub struct ExampleGroup {
    pub(crate) title: String,
    pub(crate) context: Context,
    pub(crate) children: Vec<Child>,
    pub(crate) hooks: Hooks,
    pub(crate) only: bool,
    pub(crate) descendant_only: bool,
    pub(crate) timing: Timing,
}

impl ExampleGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_context(title, Context::new())
    }

    pub fn with_context(title: impl Into<String>, context: Context) -> Self {
        Self {
            title: title.into(),
            context,
            children: Vec::new(),
            hooks: Hooks::default(),
            only: false,
            descendant_only: false,
            timing: Timing::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Template scope; runs derive a fresh scope from it
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Add a node of any supported kind
    pub fn add(&mut self, node: Box<dyn Node>) -> Result<(), BuildError> {
        let kind = node.kind();
        let node = node.into_any();

        let node = match node.downcast::<Example>() {
            Ok(example) => {
                self.add_example(*example);
                return Ok(());
            }
            Err(other) => other,
        };
        let node = match node.downcast::<ExampleGroup>() {
            Ok(group) => {
                self.add_group(*group);
                return Ok(());
            }
            Err(other) => other,
        };
        match node.downcast::<Hook>() {
            Ok(hook) => {
                self.add_hook(*hook);
                Ok(())
            }
            Err(_) => Err(BuildError::UnsupportedNodeKind(kind.to_string())),
        }
    }

    pub fn add_example(&mut self, example: Example) {
        if example.has_only() {
            self.mark_has_only();
        }
        self.children.push(Child::Example(example));
    }

    pub fn add_group(&mut self, group: ExampleGroup) {
        if group.has_only() {
            self.mark_has_only();
        }
        self.children.push(Child::Group(group));
    }

    pub fn add_hook(&mut self, hook: Hook) {
        self.hooks.add(hook);
    }

    /// Mark this group itself as the restricted subset
    pub fn mark_only(&mut self) {
        self.only = true;
    }

    /// Record that a marked node exists below this group
    ///
    /// Callers propagate to every ancestor; `SpecBuilder` walks its stack.
    pub fn mark_has_only(&mut self) {
        self.descendant_only = true;
    }

    /// Marked itself or containing a marked node
    pub fn has_only(&self) -> bool {
        self.only || self.descendant_only
    }

    /// Whether this group was itself marked
    pub fn is_only(&self) -> bool {
        self.only
    }

    /// Cached flag: some descendant is marked
    pub fn contains_only(&self) -> bool {
        self.descendant_only
    }

    /// Derive the descendant flag by walking the tree
    pub fn scan_has_only(&self) -> bool {
        self.children.iter().any(|child| match child {
            Child::Example(e) => e.has_only(),
            Child::Group(g) => g.is_only() || g.scan_has_only(),
        })
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        self.hooks.get(phase)
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Total number of examples below this group
    pub fn total(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Child::Example(_) => 1,
                Child::Group(g) => g.total(),
            })
            .sum()
    }

    /// This group followed by every node below it, depth-first
    pub fn descendants(&self) -> Vec<NodeRef<'_>> {
        let mut nodes = vec![NodeRef::Group(self)];
        for child in &self.children {
            match child {
                Child::Example(e) => nodes.push(NodeRef::Example(e)),
                Child::Group(g) => nodes.extend(g.descendants()),
            }
        }
        nodes
    }

    /// Every example below this group in registration order
    pub fn examples(&self) -> Vec<&Example> {
        self.descendants()
            .into_iter()
            .filter_map(|node| node.as_example())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.children.iter().any(|child| match child {
            Child::Example(e) => e.is_failure(),
            Child::Group(g) => g.has_failures(),
        })
    }

    /// Clear run state so the tree can be executed again
    pub fn reset(&mut self) {
        self.timing.reset();
        for child in &mut self.children {
            match child {
                Child::Example(e) => e.reset(),
                Child::Group(g) => g.reset(),
            }
        }
    }

    /// Indented outline of the tree
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let marker = if self.only { " [only]" } else { "" };
        out.push_str(&format!(
            "{}{}{} ({})\n",
            "  ".repeat(depth),
            self.title,
            marker,
            self.total()
        ));
        for child in &self.children {
            match child {
                Child::Example(e) => {
                    let marker = if e.has_only() { " [only]" } else { "" };
                    out.push_str(&format!("{}- {}{}\n", "  ".repeat(depth + 1), e.title(), marker));
                }
                Child::Group(g) => g.write_outline(out, depth + 1),
            }
        }
    }
}

impl fmt::Debug for ExampleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleGroup")
            .field("title", &self.title)
            .field("only", &self.only)
            .field("descendant_only", &self.descendant_only)
            .field("children", &self.children)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
