//! Node kinds and their per-kind records.
//!
//! Optional attributes are explicit `Option` fields. Every setter treats an
//! empty value as "clear the field", so `set_type(Some(""))` and
//! `set_type(None)` are the same operation.

use rststub_syntax::{RefKind, Reference};
use serde::Serialize;

use crate::diagnostics::Diagnostic;

/// Stable handle into a [`Tree`](super::Tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Whether a function takes an implicit first parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Module,
    Instance,
    Class,
    Static,
}

impl Scope {
    /// Scope implied by a directive name.
    pub fn from_directive(name: &str) -> Self {
        match name {
            "method" => Scope::Instance,
            "classmethod" => Scope::Class,
            "staticmethod" => Scope::Static,
            _ => Scope::Module,
        }
    }
}

// -- Capabilities -------------------------------------------------------------

/// Entities that carry a name.
pub trait Named {
    fn name(&self) -> Option<&str>;
    fn set_name(&mut self, name: Option<String>);
}

/// Entities that carry a type expression.
pub trait Typed {
    fn type_info(&self) -> Option<&str>;
    fn set_type(&mut self, type_info: Option<String>);
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

macro_rules! impl_named {
    ($($record:ty),*) => {$(
        impl Named for $record {
            fn name(&self) -> Option<&str> {
                self.name.as_deref()
            }

            fn set_name(&mut self, name: Option<String>) {
                self.name = non_empty(name);
            }
        }
    )*};
}

macro_rules! impl_typed {
    ($($record:ty),*) => {$(
        impl Typed for $record {
            fn type_info(&self) -> Option<&str> {
                self.type_info.as_deref()
            }

            fn set_type(&mut self, type_info: Option<String>) {
                self.type_info = non_empty(type_info);
            }
        }
    )*};
}

impl_named!(Module, Class, Function, Property, Data, Argument);
impl_typed!(Function, Property, Data, Argument);

// -- Records ------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    name: Option<String>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        let mut module = Self::default();
        module.set_name(Some(name.trim().to_string()));
        module
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Class {
    name: Option<String>,
    base_types: Vec<String>,
}

impl Class {
    pub fn new(name: &str) -> Self {
        let mut class = Self::default();
        class.set_name(Some(name.to_string()));
        class
    }

    pub fn base_types(&self) -> &[String] {
        &self.base_types
    }

    /// Replace the base list. Order is kept, duplicates and blanks are
    /// dropped, and the class never lists itself.
    pub fn set_base_types<I, S>(&mut self, bases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result: Vec<String> = Vec::new();
        for base in bases {
            let base = base.into().trim().to_string();
            if base.is_empty() || Some(base.as_str()) == self.name.as_deref() {
                continue;
            }
            if !result.contains(&base) {
                result.push(base);
            }
        }
        self.base_types = result;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
    name: Option<String>,
    type_info: Option<String>,
    pub scope: Scope,
    returns: Option<String>,
}

impl Function {
    pub fn new(name: &str, scope: Scope) -> Self {
        let mut function = Self {
            scope,
            ..Self::default()
        };
        function.set_name(Some(name.to_string()));
        function
    }

    /// Free-text description of the return value.
    pub fn returns(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    pub fn set_returns(&mut self, returns: Option<String>) {
        self.returns = non_empty(returns);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Property {
    name: Option<String>,
    type_info: Option<String>,
}

impl Property {
    pub fn new(name: &str) -> Self {
        let mut property = Self::default();
        property.set_name(Some(name.to_string()));
        property
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data {
    name: Option<String>,
    type_info: Option<String>,
}

impl Data {
    pub fn new(name: &str) -> Self {
        let mut data = Self::default();
        data.set_name(Some(name.to_string()));
        data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Argument {
    name: Option<String>,
    type_info: Option<String>,
    default: Option<String>,
}

impl Argument {
    pub fn new(name: &str) -> Self {
        let mut argument = Self::default();
        argument.set_name(Some(name.to_string()));
        argument
    }

    /// Default value literal, kept as written.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn set_default(&mut self, default: Option<String>) {
        self.default = non_empty(default);
    }
}

/// `import module` or `from module import a, b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    types: Vec<String>,
}

impl Import {
    pub fn module(module: &str) -> Self {
        Self {
            module: module.to_string(),
            types: Vec::new(),
        }
    }

    pub fn from_module(module: &str, types: &[&str]) -> Self {
        let mut import = Self::module(module);
        import.set_types(types.iter().map(|t| t.to_string()));
        import
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Imported names are kept sorted and unique.
    pub fn set_types(&mut self, types: impl IntoIterator<Item = String>) {
        let mut types: Vec<String> = types
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        types.sort();
        types.dedup();
        self.types = types;
    }

    pub fn is_relative(&self) -> bool {
        self.module.starts_with('.')
    }

    pub fn text(&self) -> String {
        if self.types.is_empty() {
            format!("import {}", self.module)
        } else {
            format!("from {} import {}", self.module, self.types.join(", "))
        }
    }
}

// -- Node ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Node {
    Document,
    Module(Module),
    Class(Class),
    Function(Function),
    Property(Property),
    Data(Data),
    Argument(Argument),
    Import(Import),
    DocString,
    /// Section title with its underline character.
    Title { text: String, marker: char },
    Paragraph,
    Text(String),
    Reference(Reference),
    LiteralBlock(String),
    /// Block quote; children are rendered indented.
    Indented,
    FieldList,
    /// `:name: body`; children hold the parsed body, `body` the flattened text.
    Field { name: String, body: String },
    /// Directive kept verbatim.
    Raw(String),
    Message(Diagnostic),
}

impl Node {
    /// Tag used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Document => "document",
            Node::Module(_) => "module",
            Node::Class(_) => "class",
            Node::Function(_) => "function",
            Node::Property(_) => "property",
            Node::Data(_) => "data",
            Node::Argument(_) => "argument",
            Node::Import(_) => "import",
            Node::DocString => "docstring",
            Node::Title { .. } => "title",
            Node::Paragraph => "paragraph",
            Node::Text(_) => "text",
            Node::Reference(_) => "reference",
            Node::LiteralBlock(_) => "literal_block",
            Node::Indented => "indented",
            Node::FieldList => "field_list",
            Node::Field { .. } => "field",
            Node::Raw(_) => "raw",
            Node::Message(_) => "message",
        }
    }

    /// Data, property, function or class.
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            Node::Class(_) | Node::Function(_) | Node::Property(_) | Node::Data(_)
        )
    }

    pub fn as_named(&self) -> Option<&dyn Named> {
        match self {
            Node::Module(n) => Some(n),
            Node::Class(n) => Some(n),
            Node::Function(n) => Some(n),
            Node::Property(n) => Some(n),
            Node::Data(n) => Some(n),
            Node::Argument(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_named_mut(&mut self) -> Option<&mut dyn Named> {
        match self {
            Node::Module(n) => Some(n),
            Node::Class(n) => Some(n),
            Node::Function(n) => Some(n),
            Node::Property(n) => Some(n),
            Node::Data(n) => Some(n),
            Node::Argument(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_typed(&self) -> Option<&dyn Typed> {
        match self {
            Node::Function(n) => Some(n),
            Node::Property(n) => Some(n),
            Node::Data(n) => Some(n),
            Node::Argument(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_typed_mut(&mut self) -> Option<&mut dyn Typed> {
        match self {
            Node::Function(n) => Some(n),
            Node::Property(n) => Some(n),
            Node::Data(n) => Some(n),
            Node::Argument(n) => Some(n),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.as_named().and_then(|n| n.name())
    }

    pub fn type_info(&self) -> Option<&str> {
        self.as_typed().and_then(|t| t.type_info())
    }

    /// Role a reference to this node is written under.
    pub fn ref_kind(&self) -> Option<RefKind> {
        match self {
            Node::Module(_) => Some(RefKind::Module),
            Node::Class(_) => Some(RefKind::Class),
            Node::Function(_) => Some(RefKind::Function),
            Node::Property(_) => Some(RefKind::Property),
            Node::Data(_) => Some(RefKind::Data),
            _ => None,
        }
    }
}
