//! Tree node abstraction

use std::any::Any;

use super::{Example, ExampleGroup, Hook};

/// Anything a loader may hand to [`ExampleGroup::add`]
pub trait Node: Any {
    /// Display name
    fn title(&self) -> &str;

    /// Kind name used in diagnostics
    fn kind(&self) -> &'static str;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl Node for Example {
    fn title(&self) -> &str {
        Example::title(self)
    }

    fn kind(&self) -> &'static str {
        "example"
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Node for ExampleGroup {
    fn title(&self) -> &str {
        ExampleGroup::title(self)
    }

    fn kind(&self) -> &'static str {
        "example_group"
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Node for Hook {
    fn title(&self) -> &str {
        self.phase().name()
    }

    fn kind(&self) -> &'static str {
        "hook"
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An owned child of a group, in registration order
#[derive(Debug)]
pub enum Child {
    Example(Example),
    Group(ExampleGroup),
}

impl Child {
    pub fn title(&self) -> &str {
        match self {
            Child::Example(e) => e.title(),
            Child::Group(g) => g.title(),
        }
    }

    /// Marked itself, or (for groups) contains a marked node
    pub fn has_only(&self) -> bool {
        match self {
            Child::Example(e) => e.has_only(),
            Child::Group(g) => g.has_only(),
        }
    }
}

/// Borrowed view of a tree entry
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Example(&'a Example),
    Group(&'a ExampleGroup),
}

impl<'a> NodeRef<'a> {
    pub fn title(&self) -> &'a str {
        match self {
            NodeRef::Example(e) => e.title(),
            NodeRef::Group(g) => g.title(),
        }
    }

    pub fn as_example(&self) -> Option<&'a Example> {
        match self {
            NodeRef::Example(e) => Some(e),
            NodeRef::Group(_) => None,
        }
    }
}
