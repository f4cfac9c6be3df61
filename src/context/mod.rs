//! Lazy fixture scope
//!
//! A [`Context`] holds named fixture factories, a memo of values its factories
//! produced, the values assigned to it directly, and a link to the enclosing
//! run-time scope. Deriving a context copies the factories and the parent link
//! but never the values, which is how every example gets a fresh view of its
//! fixtures.
//!
//! Only assigned values are shared with nested scopes. A factory result
//! memoized in an enclosing scope stays there; a nested scope asking for the
//! same name runs the factory again and keeps its own value.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{Failure, Signal};

/// A resolved fixture value
pub type Fixture = Rc<dyn Any>;

type Factory = Rc<dyn Fn(&Context) -> Result<Fixture, Signal>>;

/// Fixture resolution environment
#[derive(Default)]
pub struct Context {
    factories: HashMap<String, Factory>,
    memo: RefCell<HashMap<String, Fixture>>,
    assigned: RefCell<HashMap<String, Fixture>>,
    resolving: RefCell<HashSet<String>>,
    parent: Option<Rc<Context>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or shadow a lazy fixture
    ///
    /// The factory receives the context that asked for the value, so it can
    /// resolve other fixtures visible from there.
    pub fn set_factory<T, F>(&mut self, name: impl Into<String>, factory: F)
    where
        T: 'static,
        F: Fn(&Context) -> T + 'static,
    {
        self.set_try_factory(name, move |ctx| Ok(factory(ctx)));
    }

    /// Register a fixture whose construction can fail or signal
    pub fn set_try_factory<T, F>(&mut self, name: impl Into<String>, factory: F)
    where
        T: 'static,
        F: Fn(&Context) -> Result<T, Signal> + 'static,
    {
        let factory: Factory = Rc::new(move |ctx| factory(ctx).map(|v| Rc::new(v) as Fixture));
        self.factories.insert(name.into(), factory);
    }

    /// Rebind the scope used for fallthrough lookups
    pub fn set_parent_context(&mut self, parent: Rc<Context>) {
        self.parent = Some(parent);
    }

    pub fn parent(&self) -> Option<&Rc<Context>> {
        self.parent.as_ref()
    }

    /// Copy factories and parent link into a context with an empty memo
    pub fn derive(&self) -> Context {
        Context {
            factories: self.factories.clone(),
            memo: RefCell::default(),
            assigned: RefCell::default(),
            resolving: RefCell::default(),
            parent: self.parent.clone(),
        }
    }

    /// Derive a scope whose parent is this live scope
    pub fn child(self: &Rc<Self>) -> Context {
        let mut child = self.derive();
        child.set_parent_context(Rc::clone(self));
        child
    }

    /// Whether a factory or value is visible under this name
    pub fn defines(&self, name: &str) -> bool {
        self.factories.contains_key(name)
            || self.memo.borrow().contains_key(name)
            || self.assigned.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.defines(name))
    }

    /// Whether this scope already holds a value for the name
    pub fn is_memoized(&self, name: &str) -> bool {
        self.memo.borrow().contains_key(name) || self.assigned.borrow().contains_key(name)
    }

    /// Store a value directly in this scope, visible to nested scopes
    pub fn assign<T: 'static>(&self, name: impl Into<String>, value: T) -> Rc<T> {
        let name = name.into();
        let value = Rc::new(value);
        self.memo.borrow_mut().remove(&name);
        self.assigned
            .borrow_mut()
            .insert(name, Rc::clone(&value) as Fixture);
        value
    }

    /// Resolve a fixture by name
    ///
    /// Order: this scope's assigned values and memo, this scope's factory,
    /// then each ancestor's assigned values and factory. A factory found on
    /// an ancestor is invoked against, and memoized in, this scope.
    pub fn resolve(&self, name: &str) -> Result<Fixture, Signal> {
        if let Some(value) = self.assigned.borrow().get(name) {
            return Ok(Rc::clone(value));
        }
        if let Some(value) = self.memo.borrow().get(name) {
            return Ok(Rc::clone(value));
        }

        let factory = match self.factories.get(name) {
            Some(factory) => Rc::clone(factory),
            None => match self.lookup_ancestors(name) {
                Some(Lookup::Value(value)) => return Ok(value),
                Some(Lookup::Factory(factory)) => factory,
                None => return Err(Failure::UndefinedFixture(name.to_string()).into()),
            },
        };

        if !self.resolving.borrow_mut().insert(name.to_string()) {
            return Err(Failure::CyclicFixture(name.to_string()).into());
        }
        trace!("computing fixture {}", name);
        let computed = factory(self);
        self.resolving.borrow_mut().remove(name);

        let value = computed?;
        self.memo
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&value));
        Ok(value)
    }

    /// Resolve and downcast a fixture
    pub fn get<T: 'static>(&self, name: &str) -> Result<Rc<T>, Signal> {
        self.resolve(name)?.downcast::<T>().map_err(|_| {
            Failure::FixtureType {
                name: name.to_string(),
                expected: type_name::<T>(),
            }
            .into()
        })
    }

    fn lookup_ancestors(&self, name: &str) -> Option<Lookup> {
        let mut current = self.parent.as_ref();
        while let Some(scope) = current {
            if let Some(value) = scope.assigned.borrow().get(name) {
                return Some(Lookup::Value(Rc::clone(value)));
            }
            if let Some(factory) = scope.factories.get(name) {
                return Some(Lookup::Factory(Rc::clone(factory)));
            }
            current = scope.parent.as_ref();
        }
        None
    }
}

enum Lookup {
    Value(Fixture),
    Factory(Factory),
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factories: Vec<_> = self.factories.keys().collect();
        factories.sort();
        let mut memo: Vec<_> = self.memo.borrow().keys().cloned().collect();
        memo.sort();
        let mut assigned: Vec<_> = self.assigned.borrow().keys().cloned().collect();
        assigned.sort();
        f.debug_struct("Context")
            .field("factories", &factories)
            .field("memo", &memo)
            .field("assigned", &assigned)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_context(calls: Rc<Cell<u32>>) -> Context {
        let mut ctx = Context::new();
        ctx.set_factory("answer", move |_| {
            calls.set(calls.get() + 1);
            calls.get()
        });
        ctx
    }

    #[test]
    fn test_factory_is_memoized_per_instance() {
        let calls = Rc::new(Cell::new(0));
        let ctx = counting_context(calls.clone());

        let first = ctx.get::<u32>("answer").unwrap();
        let second = ctx.get::<u32>("answer").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_derive_resets_memo() {
        let calls = Rc::new(Cell::new(0));
        let template = counting_context(calls.clone());

        let a = template.derive();
        let b = template.derive();
        assert_eq!(*a.get::<u32>("answer").unwrap(), 1);
        assert_eq!(*b.get::<u32>("answer").unwrap(), 2);
        assert!(!template.is_memoized("answer"));
    }

    #[test]
    fn test_undefined_fixture() {
        let ctx = Context::new();
        match ctx.resolve("missing") {
            Err(Signal::Failure(Failure::UndefinedFixture(name))) => assert_eq!(name, "missing"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parent_fallthrough_memoizes_locally() {
        let calls = Rc::new(Cell::new(0));
        let parent = Rc::new(counting_context(calls.clone()));

        let a = Rc::new(Context::new()).child();
        assert!(a.resolve("answer").is_err());

        let first = parent.child();
        let second = parent.child();
        assert_eq!(*first.get::<u32>("answer").unwrap(), 1);
        assert_eq!(*second.get::<u32>("answer").unwrap(), 2);
        assert!(!parent.is_memoized("answer"));
        assert!(first.is_memoized("answer"));
    }

    #[test]
    fn test_parent_assignment_is_shared() {
        let parent = Rc::new(Context::new());
        parent.assign("connection", String::from("db://test"));

        let child = parent.child();
        let value = child.get::<String>("connection").unwrap();
        assert_eq!(value.as_str(), "db://test");
        assert!(child.defines("connection"));
    }

    #[test]
    fn test_parent_memo_is_not_shared() {
        let calls = Rc::new(Cell::new(0));
        let parent = Rc::new(counting_context(calls.clone()));
        assert_eq!(*parent.get::<u32>("answer").unwrap(), 1);

        // A nested scope without its own factory still gets a fresh value.
        let mut nested = Context::new();
        nested.set_parent_context(parent.clone());
        let nested = Rc::new(nested);

        let first = nested.child();
        let second = nested.child();
        assert_eq!(*first.get::<u32>("answer").unwrap(), 2);
        assert_eq!(*second.get::<u32>("answer").unwrap(), 3);
        assert!(!nested.is_memoized("answer"));
    }

    #[test]
    fn test_assign_replaces_memoized_value() {
        let ctx = counting_context(Rc::new(Cell::new(0)));
        assert_eq!(*ctx.get::<u32>("answer").unwrap(), 1);
        ctx.assign("answer", 7u32);
        assert_eq!(*ctx.get::<u32>("answer").unwrap(), 7);
    }

    #[test]
    fn test_shadowing_prefers_local_factory() {
        let mut parent = Context::new();
        parent.set_factory("name", |_| "outer");
        let parent = Rc::new(parent);

        let mut inner = parent.child();
        inner.set_factory("name", |_| "inner");
        assert_eq!(*inner.get::<&str>("name").unwrap(), "inner");
    }

    #[test]
    fn test_factory_resolves_other_fixtures() {
        let mut ctx = Context::new();
        ctx.set_factory("base", |_| 40u32);
        ctx.set_try_factory("derived", |ctx| Ok(*ctx.get::<u32>("base")? + 2));
        assert_eq!(*ctx.get::<u32>("derived").unwrap(), 42);
    }

    #[test]
    fn test_cyclic_fixture() {
        let mut ctx = Context::new();
        ctx.set_try_factory("loop", |ctx| ctx.get::<u32>("loop").map(|v| *v));
        match ctx.resolve("loop") {
            Err(Signal::Failure(Failure::CyclicFixture(name))) => assert_eq!(name, "loop"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch() {
        let mut ctx = Context::new();
        ctx.set_factory("count", |_| 3u8);
        match ctx.get::<String>("count") {
            Err(Signal::Failure(Failure::FixtureType { name, .. })) => assert_eq!(name, "count"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
