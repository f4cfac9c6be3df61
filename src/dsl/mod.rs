//! Tree-building entry points
//!
//! [`SpecBuilder`] keeps an explicit stack of open groups. Every DSL call
//! lands on the group at the top of the stack; `describe` pushes a group,
//! runs its body and pops it into its parent.
//!
//! ```
//! use dspec::{fail, SpecBuilder};
//!
//! let mut spec = SpecBuilder::new("Suite");
//! spec.describe("arithmetic", |s| {
//!     s.let_fixture("two", |_| 2);
//!     s.it("adds", |ctx| {
//!         if *ctx.get::<i32>("two")? + 2 != 4 {
//!             return fail("math is broken");
//!         }
//!         Ok(())
//!     });
//! });
//! assert_eq!(spec.finish().total(), 1);
//! ```

use tracing::debug;

use crate::context::Context;
use crate::error::{pending, skip, BuildError, Outcome, Signal};
use crate::models::{Example, ExampleGroup, Hook, HookPhase, Node};
use crate::reporter::Reporter;

/// One loadable source of spec definitions
pub trait SpecUnit {
    /// Identifier announced before the unit is loaded
    fn id(&self) -> &str;

    fn define(&self, spec: &mut SpecBuilder);
}

/// A [`SpecUnit`] backed by a closure
pub struct FnUnit<F> {
    id: String,
    define: F,
}

impl<F> SpecUnit for FnUnit<F>
where
    F: Fn(&mut SpecBuilder),
{
    fn id(&self) -> &str {
        &self.id
    }

    fn define(&self, spec: &mut SpecBuilder) {
        (self.define)(spec)
    }
}

/// Wrap a closure as a boxed spec unit
pub fn unit<F>(id: impl Into<String>, define: F) -> Box<dyn SpecUnit>
where
    F: Fn(&mut SpecBuilder) + 'static,
{
    Box::new(FnUnit {
        id: id.into(),
        define,
    })
}

/// Builds an example tree through an explicit group stack
#[derive(Debug)]
pub struct SpecBuilder {
    root: ExampleGroup,
    open: Vec<ExampleGroup>,
}

impl SpecBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_root(ExampleGroup::new(title))
    }

    /// Continue building an existing tree
    pub fn with_root(root: ExampleGroup) -> Self {
        Self {
            root,
            open: Vec::new(),
        }
    }

    /// Load units into `root` in order
    ///
    /// The reporter is told about each unit before its definitions run.
    pub fn load(units: &[Box<dyn SpecUnit>], root: ExampleGroup, reporter: &Reporter) -> ExampleGroup {
        let mut spec = Self::with_root(root);
        for unit in units {
            reporter.unit_loading(unit.id());
            debug!("loading unit {}", unit.id());
            unit.define(&mut spec);
        }
        spec.finish()
    }

    /// Close any open groups and return the root
    pub fn finish(mut self) -> ExampleGroup {
        while let Some(group) = self.open.pop() {
            self.current().add_group(group);
        }
        self.root
    }

    /// Nesting depth of the group receiving calls; the root is 0
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn current(&mut self) -> &mut ExampleGroup {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    fn group<F>(&mut self, group: ExampleGroup, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let depth = self.open.len();
        self.open.push(group);
        body(self);
        // Adding to the parent carries the only-mark upwards.
        while self.open.len() > depth {
            if let Some(group) = self.open.pop() {
                self.current().add_group(group);
            }
        }
        self
    }

    pub fn describe<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.group(ExampleGroup::new(title), body)
    }

    pub fn context<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.describe(title, body)
    }

    /// A group whose examples are all skipped
    pub fn xdescribe<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.describe(title, |s| {
            s.before_each(|_| skip("group disabled"));
            body(s);
        })
    }

    pub fn xcontext<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.xdescribe(title, body)
    }

    /// A group that restricts the run to itself
    pub fn describe_only<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let mut group = ExampleGroup::new(title);
        group.mark_only();
        self.group(group, body)
    }

    pub fn context_only<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.describe_only(title, body)
    }

    pub fn it<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.current().add_example(Example::new(title, body));
        self
    }

    pub fn test<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.it(title, body)
    }

    /// An example without a body yet
    pub fn it_pending(&mut self, title: impl Into<String>) -> &mut Self {
        self.it(title, |_| pending("not yet implemented"))
    }

    /// An example that is registered but never executed
    ///
    /// The body only has to type-check; it is dropped here and never stored
    /// in the tree. The example reports as skipped.
    pub fn xit<F>(&mut self, title: impl Into<String>, _body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.it(title, |_| skip("example disabled"))
    }

    pub fn xtest<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.xit(title, body)
    }

    pub fn it_only<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        let mut example = Example::new(title, body);
        example.mark_only();
        self.current().add_example(example);
        self
    }

    pub fn test_only<F>(&mut self, title: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.it_only(title, body)
    }

    /// Lazy fixture on the current group
    pub fn let_fixture<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&Context) -> T + 'static,
    {
        self.current().context_mut().set_factory(name, factory);
        self
    }

    pub fn let_try_fixture<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&Context) -> Result<T, Signal> + 'static,
    {
        self.current().context_mut().set_try_factory(name, factory);
        self
    }

    fn hook<F>(&mut self, phase: HookPhase, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.current().add_hook(Hook::new(phase, body));
        self
    }

    pub fn before_context<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.hook(HookPhase::BeforeContext, body)
    }

    pub fn after_context<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.hook(HookPhase::AfterContext, body)
    }

    pub fn before_each<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.hook(HookPhase::BeforeEach, body)
    }

    pub fn after_each<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&Context) -> Outcome + 'static,
    {
        self.hook(HookPhase::AfterEach, body)
    }

    /// Add a prebuilt node to the current group
    pub fn add(&mut self, node: Box<dyn Node>) -> Result<&mut Self, BuildError> {
        self.current().add(node)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Activation, WorkerPool};
    use crate::models::{Child, ExampleStatus};
    use crate::reporter::MemorySink;

    fn run(root: &mut ExampleGroup) -> Reporter {
        let mut reporter = Reporter::new();
        let activation = root.run(&mut reporter, &WorkerPool::disabled()).unwrap();
        assert_eq!(activation, Activation::Coordinator);
        reporter
    }

    #[test]
    fn test_describe_nests_groups() {
        let mut spec = SpecBuilder::new("Suite");
        spec.it("top", |_| Ok(()));
        spec.describe("outer", |s| {
            assert_eq!(s.depth(), 1);
            s.it("one", |_| Ok(()));
            s.context("inner", |s| {
                s.it("two", |_| Ok(()));
                s.test("three", |_| Ok(()));
            });
        });
        let root = spec.finish();

        assert_eq!(root.total(), 4);
        assert_eq!(root.children().len(), 2);
        match &root.children()[1] {
            Child::Group(outer) => {
                assert_eq!(outer.title(), "outer");
                assert_eq!(outer.children().len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_it_only_marks_every_ancestor() {
        let mut spec = SpecBuilder::new("Suite");
        spec.describe("a", |s| {
            s.describe("b", |s| {
                s.it_only("focused", |_| Ok(()));
            });
        });
        spec.describe("c", |s| {
            s.it("plain", |_| Ok(()));
        });
        let root = spec.finish();

        assert!(root.has_only());
        assert!(root.contains_only());
        assert!(!root.is_only());
        assert_eq!(root.scan_has_only(), root.contains_only());
        let flags: Vec<bool> = root.children().iter().map(Child::has_only).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_describe_only_marks_group() {
        let mut spec = SpecBuilder::new("Suite");
        spec.context_only("focused", |s| {
            s.it("x", |_| Ok(()));
        });
        let root = spec.finish();
        match &root.children()[0] {
            Child::Group(g) => assert!(g.is_only()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(root.contains_only());
    }

    #[test]
    fn test_disabled_and_pending_examples() {
        let mut spec = SpecBuilder::new("Suite");
        spec.xit("off", |_| fail_loudly());
        spec.xtest("also off", |_| Ok(()));
        spec.it_pending("later");
        spec.xdescribe("disabled group", |s| {
            s.it("would fail", |_| fail_loudly());
        });
        spec.xcontext("disabled context", |s| {
            s.it("would pass", |_| Ok(()));
        });
        let mut root = spec.finish();

        let reporter = run(&mut root);
        assert_eq!(reporter.skipped().len(), 4);
        assert_eq!(reporter.pending().len(), 1);
        assert!(!reporter.has_failure());
        assert!(root
            .examples()
            .iter()
            .all(|e| e.status() != ExampleStatus::Failed));
    }

    fn fail_loudly() -> Outcome {
        crate::error::fail("should never run")
    }

    #[test]
    fn test_fixtures_and_hooks_land_on_current_group() {
        let mut spec = SpecBuilder::new("Suite");
        spec.let_fixture("base", |_| 10);
        spec.describe("inner", |s| {
            s.let_try_fixture("doubled", |ctx| Ok(*ctx.get::<i32>("base")? * 2));
            s.before_each(|ctx| {
                ctx.assign("seen", true);
                Ok(())
            });
            s.it("reads both", |ctx| {
                crate::ensure_that!(*ctx.get::<i32>("doubled")? == 20);
                crate::ensure_that!(*ctx.get::<bool>("seen")?);
                Ok(())
            });
        });
        let mut root = spec.finish();

        assert!(root.context().defines("base"));
        let reporter = run(&mut root);
        assert_eq!(reporter.passes().len(), 1, "{:?}", reporter.failures());
    }

    #[test]
    fn test_add_prebuilt_nodes() {
        let mut spec = SpecBuilder::new("Suite");
        spec.add(Box::new(Example::new("prebuilt", |_| Ok(()))))
            .unwrap()
            .add(Box::new(Hook::new(HookPhase::AfterEach, |_| Ok(()))))
            .unwrap();
        let root = spec.finish();
        assert_eq!(root.total(), 1);
        assert_eq!(root.hooks(HookPhase::AfterEach).len(), 1);
    }

    #[test]
    fn test_load_announces_units_in_order() {
        let sink = MemorySink::new();
        let reporter = Reporter::with_sink(Box::new(sink.clone()));
        let units = vec![
            unit("math", |s| {
                s.it("adds", |_| Ok(()));
            }),
            unit("strings", |s| {
                s.describe("concat", |s| {
                    s.it("joins", |_| Ok(()));
                });
            }),
        ];

        let root = SpecBuilder::load(&units, ExampleGroup::new("Suite"), &reporter);

        assert_eq!(root.title(), "Suite");
        assert_eq!(root.total(), 2);
        let loaded: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                crate::reporter::Event::UnitLoading { unit } => Some(unit),
                _ => None,
            })
            .collect();
        assert_eq!(loaded, vec!["math", "strings"]);
    }

    #[test]
    fn test_load_appends_to_existing_root() {
        let mut existing = ExampleGroup::new("Existing");
        existing.add_example(Example::new("already here", |_| Ok(())));
        let units = [unit("more", |s| {
            s.it("new", |_| Ok(()));
        })];

        let root = SpecBuilder::load(&units, existing, &Reporter::new());
        let titles: Vec<&str> = root.children().iter().map(Child::title).collect();
        assert_eq!(titles, vec!["already here", "new"]);
    }
}
