//! Document model: an arena tree of API entities and narrative blocks.

mod node;
mod query;
mod tree;

pub use node::{
    Argument, Class, Data, Function, Import, Module, Named, Node, NodeId, Property, Scope, Typed,
};
pub use query::localise;
pub(crate) use query::{indent, RE_DOTTED};
pub use tree::Tree;
