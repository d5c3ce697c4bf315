//! Derived queries over the document tree.

use regex::{Captures, Regex};
use rststub_syntax::{Reference, ANY};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::node::{Node, NodeId, Scope};
use super::tree::Tree;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};

/// Dotted identifiers inside a type expression.
pub(crate) static RE_DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*").unwrap()
});

/// Strip `module.` from every dotted name in `expr`.
///
/// `localise("bpy.types", "typing.List[bpy.types.Object]")` →
/// `typing.List[Object]`.
pub fn localise(module: &str, expr: &str) -> String {
    let prefix = format!("{module}.");
    RE_DOTTED
        .replace_all(expr, |caps: &Captures| {
            let token = &caps[0];
            token.strip_prefix(&prefix).unwrap_or(token).to_string()
        })
        .into_owned()
}

impl Tree {
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name()
    }

    /// Dot-joined names from the owning module down to `id`.
    ///
    /// `None` when `id` is unnamed, has an unnamed ancestor, or is not
    /// attached below a module.
    pub fn full_name(&self, id: NodeId) -> Option<String> {
        let mut segments = vec![self.name(id)?];
        if matches!(self.node(id), Node::Module(_)) {
            return Some(segments[0].to_string());
        }
        for ancestor in self.ancestors(id) {
            let node = self.node(ancestor);
            if node.as_named().is_none() {
                return None;
            }
            segments.push(node.name()?);
            if matches!(node, Node::Module(_)) {
                segments.reverse();
                return Some(segments.join("."));
            }
        }
        None
    }

    /// Nearest enclosing module.
    pub fn module_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| matches!(self.node(*a), Node::Module(_)))
    }

    pub fn docstring(&self, id: NodeId) -> Option<NodeId> {
        self.first_child(id, |n| matches!(n, Node::DocString))
    }

    /// Direct data, property, function and class children.
    pub fn members(&self, id: NodeId) -> Vec<NodeId> {
        self.children_where(id, Node::is_member)
    }

    pub fn classes(&self, id: NodeId) -> Vec<NodeId> {
        self.children_where(id, |n| matches!(n, Node::Class(_)))
    }

    pub fn imports(&self, id: NodeId) -> Vec<NodeId> {
        self.children_where(id, |n| matches!(n, Node::Import(_)))
    }

    pub fn arguments(&self, id: NodeId) -> Vec<NodeId> {
        self.children_where(id, |n| matches!(n, Node::Argument(_)))
    }

    fn children_where(&self, id: NodeId, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| pred(self.node(*c)))
            .collect()
    }

    /// Every type expression used below `id`, always including `typing`.
    pub fn referred_types(&self, id: NodeId) -> BTreeSet<String> {
        let mut types = BTreeSet::from(["typing".to_string()]);
        let node = self.node(id);

        if let Some(t) = node.type_info() {
            if t != "None" {
                types.insert(t.to_string());
            }
        }

        if matches!(node, Node::Function(_) | Node::Class(_)) {
            for arg in self.arguments(id) {
                if let Some(t) = self.node(arg).type_info() {
                    types.insert(t.to_string());
                }
            }
        }

        if let Node::Class(class) = node {
            types.extend(class.base_types().iter().cloned());
        }

        if matches!(node, Node::Class(_) | Node::Module(_)) {
            for member in self.members(id) {
                types.extend(self.referred_types(member));
            }
        }

        types
    }

    /// Localise `expr` against the module owning `id`.
    pub fn localise_name(&self, id: NodeId, expr: &str) -> String {
        let module = match self.node(id) {
            Node::Module(_) => Some(id),
            _ => self.module_of(id),
        };
        match module.and_then(|m| self.name(m)) {
            Some(module) => localise(module, expr),
            None => expr.to_string(),
        }
    }

    /// Whether the member renders an indented body.
    pub fn has_body(&self, id: NodeId) -> bool {
        matches!(
            self.node(id),
            Node::Property(_) | Node::Function(_) | Node::Class(_)
        )
    }

    /// Declaration header lines, e.g. `def f(self, a: int = 1) -> str:`.
    pub fn signature(&self, id: NodeId) -> Result<String> {
        let node = self.node(id);
        if !node.is_member() {
            return Err(Error::NoSignature(node.kind()));
        }
        let name = node.name().ok_or(Error::MissingName { kind: node.kind() })?;
        let type_or = |fallback: &str| {
            node.type_info()
                .map(|t| self.localise_name(id, t))
                .unwrap_or_else(|| fallback.to_string())
        };

        let signature = match node {
            Node::Data(_) => format!("{name}: {} = ...", type_or(ANY)),
            Node::Property(_) => {
                format!("@property\ndef {name}(self) -> {}:", type_or(ANY))
            }
            Node::Function(function) => {
                let mut out = String::new();
                let mut params: Vec<String> = Vec::new();
                match function.scope {
                    Scope::Class => {
                        out.push_str("@classmethod\n");
                        params.push("cls".to_string());
                    }
                    Scope::Static => out.push_str("@staticmethod\n"),
                    Scope::Instance => params.push("self".to_string()),
                    Scope::Module => {}
                }
                for arg in self.arguments(id) {
                    params.push(self.argument_text(arg));
                }
                out.push_str(&format!(
                    "def {name}({}) -> {}:",
                    params.join(", "),
                    type_or("None")
                ));
                out
            }
            Node::Class(class) if class.base_types().is_empty() => format!("class {name}:"),
            Node::Class(class) => {
                let bases: Vec<String> = class
                    .base_types()
                    .iter()
                    .map(|b| self.localise_name(id, b))
                    .collect();
                format!("class {name}({}):", bases.join(", "))
            }
            _ => unreachable!("is_member covers all member kinds"),
        };
        Ok(signature)
    }

    fn argument_text(&self, id: NodeId) -> String {
        let Node::Argument(arg) = self.node(id) else {
            return String::new();
        };
        let name = self.name(id).unwrap_or("_");
        let type_info = self
            .node(id)
            .type_info()
            .map(|t| self.localise_name(id, t))
            .unwrap_or_else(|| ANY.to_string());
        match arg.default_value() {
            Some(default) => format!("{name}: {type_info} = {default}"),
            None => format!("{name}: {type_info}"),
        }
    }

    /// A plain reference to `id` under its kind's role.
    pub fn create_ref(&self, id: NodeId) -> Option<Reference> {
        let kind = self.node(id).ref_kind()?;
        Some(Reference::new(kind, self.full_name(id)?))
    }

    /// Module or member at or below `scope` with the given qualified name.
    pub fn find(&self, scope: NodeId, qualified: &str) -> Option<NodeId> {
        std::iter::once(scope)
            .chain(self.descendants(scope))
            .filter(|id| {
                let node = self.node(*id);
                node.is_member() || matches!(node, Node::Module(_))
            })
            .find(|id| self.full_name(*id).as_deref() == Some(qualified))
    }

    pub fn diagnostics(&self, id: NodeId) -> Vec<&Diagnostic> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|d| match self.node(d) {
                Node::Message(diagnostic) => Some(diagnostic),
                _ => None,
            })
            .collect()
    }

    /// Narrative text of `id` as reStructuredText.
    ///
    /// References render through [`Reference::render`]. Members, arguments
    /// and diagnostics contribute nothing.
    pub fn text(&self, id: NodeId) -> String {
        match self.node(id) {
            Node::Text(text) => text.clone(),
            Node::Reference(reference) => reference.render(),
            Node::Paragraph => self
                .children(id)
                .iter()
                .map(|c| self.text(*c))
                .collect(),
            Node::Title { text, marker } => {
                let underline: String = std::iter::repeat(*marker)
                    .take(text.chars().count())
                    .collect();
                format!("{text}\n{underline}")
            }
            Node::LiteralBlock(text) => indent(text, "    "),
            Node::Indented => indent(&self.blocks_text(id), "    "),
            Node::FieldList => self
                .children(id)
                .iter()
                .map(|c| self.text(*c))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Node::Field { name, .. } => {
                let body = self.blocks_text(id);
                if body.is_empty() {
                    format!(":{name}:")
                } else {
                    let body = indent(&body, "   ");
                    format!(":{name}: {}", body.trim_start())
                }
            }
            Node::Raw(text) => text.clone(),
            Node::Document | Node::DocString => self.blocks_text(id),
            Node::Module(_)
            | Node::Class(_)
            | Node::Function(_)
            | Node::Property(_)
            | Node::Data(_)
            | Node::Argument(_)
            | Node::Import(_)
            | Node::Message(_) => String::new(),
        }
    }

    fn blocks_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .map(|c| self.text(*c))
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Prefix every non-empty line of `text`.
pub(crate) fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::model::node::{Argument, Class, Data, Function, Module, Property, Typed};
    use rststub_syntax::RefKind;

    fn module(tree: &mut Tree, name: &str) -> NodeId {
        let root = tree.root();
        tree.append_new(root, Node::Module(Module::new(name)))
    }

    fn typed_data(name: &str, type_info: &str) -> Node {
        let mut data = Data::new(name);
        data.set_type(Some(type_info.to_string()));
        Node::Data(data)
    }

    #[test]
    fn localise_examples() {
        assert_eq!(localise("bpy", "Object"), "Object");
        assert_eq!(localise("bpy", "bpy.Object"), "Object");
        assert_eq!(localise("bpy", "bpy.types.Object"), "types.Object");
        assert_eq!(localise("bpy.types", "bpy.Object"), "bpy.Object");
        assert_eq!(localise("bpy.types", "bpy.types.Object"), "Object");
        assert_eq!(
            localise("bge.types", "typing.List[bge.types.KX_GameObject]"),
            "typing.List[KX_GameObject]"
        );
        assert_eq!(localise("bge", "bgex.Thing"), "bgex.Thing");
    }

    #[test]
    fn full_names() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "bge.types");
        let c = tree.append_new(m, Node::Class(Class::new("KX_GameObject")));
        let f = tree.append_new(c, Node::Function(Function::new("endObject", Scope::Instance)));
        let a = tree.append_new(f, Node::Argument(Argument::new("obj")));

        assert_eq!(tree.full_name(m).as_deref(), Some("bge.types"));
        assert_eq!(tree.full_name(c).as_deref(), Some("bge.types.KX_GameObject"));
        assert_eq!(
            tree.full_name(a).as_deref(),
            Some("bge.types.KX_GameObject.endObject.obj")
        );
        assert_eq!(tree.find(m, "bge.types.KX_GameObject.endObject"), Some(f));
        assert_eq!(tree.module_of(a), Some(m));

        tree.detach(c);
        assert_eq!(tree.full_name(c), None);
        assert_eq!(tree.full_name(f), None);
    }

    #[test]
    fn unnamed_ancestor_has_no_full_name() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "m");
        let c = tree.append_new(m, Node::Class(Class::default()));
        let d = tree.append_new(c, Node::Data(Data::new("x")));
        assert_eq!(tree.full_name(d), None);
    }

    #[test]
    fn referred_types_are_collected() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "m");
        tree.append_new(m, typed_data("a", "foo.Bar"));

        let mut class = Class::new("Local");
        class.set_base_types(["base.Thing"]);
        let c = tree.append_new(m, Node::Class(class));
        let mut f = Function::new("f", Scope::Instance);
        f.set_type(Some("None".into()));
        let f = tree.append_new(c, Node::Function(f));
        let mut arg = Argument::new("x");
        arg.set_type(Some("typing.List[baz.Qux]".into()));
        tree.append_new(f, Node::Argument(arg));

        let types: Vec<String> = tree.referred_types(m).into_iter().collect();
        assert_eq!(
            types,
            ["base.Thing", "foo.Bar", "typing", "typing.List[baz.Qux]"]
        );
    }

    #[test]
    fn data_and_property_signatures() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "bge.logic");
        let d = tree.append_new(m, typed_data("mouse", "bge.types.SCA_PythonMouse"));
        let untyped = tree.append_new(m, Node::Data(Data::new("globalDict")));
        let mut prop = Property::new("name");
        prop.set_type(Some("str".into()));
        let p = tree.append_new(m, Node::Property(prop));

        assert_eq!(
            tree.signature(d).unwrap(),
            "mouse: bge.types.SCA_PythonMouse = ..."
        );
        assert_eq!(tree.signature(untyped).unwrap(), "globalDict: typing.Any = ...");
        assert_eq!(
            tree.signature(p).unwrap(),
            "@property\ndef name(self) -> str:"
        );
        assert!(!tree.has_body(d));
        assert!(tree.has_body(p));
    }

    #[test]
    fn function_signatures() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "bge.types");
        let c = tree.append_new(m, Node::Class(Class::new("KX_Scene")));

        let mut f = Function::new("addObject", Scope::Instance);
        f.set_type(Some("bge.types.KX_GameObject".into()));
        let f = tree.append_new(c, Node::Function(f));
        let mut obj = Argument::new("object");
        obj.set_type(Some("str".into()));
        tree.append_new(f, Node::Argument(obj));
        let mut time = Argument::new("time");
        time.set_default(Some("0".into()));
        tree.append_new(f, Node::Argument(time));

        assert_eq!(
            tree.signature(f).unwrap(),
            "def addObject(self, object: str, time: typing.Any = 0) -> KX_GameObject:"
        );

        let g = tree.append_new(c, Node::Function(Function::new("get", Scope::Class)));
        assert_eq!(
            tree.signature(g).unwrap(),
            "@classmethod\ndef get(cls) -> None:"
        );

        let s = tree.append_new(c, Node::Function(Function::new("make", Scope::Static)));
        tree.append_new(s, Node::Argument(Argument::new("*args")));
        assert_eq!(
            tree.signature(s).unwrap(),
            "@staticmethod\ndef make(*args: typing.Any) -> None:"
        );
    }

    #[test]
    fn class_signatures() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "bge.types");
        let mut class = Class::new("KX_Camera");
        class.set_base_types(["bge.types.KX_GameObject", "mathutils.Vector"]);
        let c = tree.append_new(m, Node::Class(class));
        assert_eq!(
            tree.signature(c).unwrap(),
            "class KX_Camera(KX_GameObject, mathutils.Vector):"
        );

        let bare = tree.append_new(m, Node::Class(Class::new("Plain")));
        assert_eq!(tree.signature(bare).unwrap(), "class Plain:");
    }

    #[test]
    fn signature_errors() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "m");
        let d = tree.append_new(m, Node::Data(Data::default()));
        assert!(matches!(
            tree.signature(d),
            Err(Error::MissingName { kind: "data" })
        ));
        assert!(matches!(tree.signature(m), Err(Error::NoSignature("module"))));
    }

    #[test]
    fn create_ref_uses_full_name() {
        let mut tree = Tree::new();
        let m = module(&mut tree, "bge.logic");
        let d = tree.append_new(m, Node::Data(Data::new("mouse")));
        let r = tree.create_ref(d).unwrap();
        assert_eq!(r.kind(), RefKind::Data);
        assert_eq!(r.render(), ":data:`bge.logic.mouse`");

        let orphan = tree.create(Node::Data(Data::new("x")));
        assert!(tree.create_ref(orphan).is_none());
    }

    #[test]
    fn narrative_text() {
        let mut tree = Tree::new();
        let ds = tree.create(Node::DocString);
        tree.append_new(
            ds,
            Node::Title {
                text: "Title".into(),
                marker: '=',
            },
        );
        let p = tree.append_new(ds, Node::Paragraph);
        tree.append_new(p, Node::Text("Loads ".into()));
        tree.append_new(
            p,
            Node::Reference(Reference::new(RefKind::Data, "~bge.logic.globalDict")),
        );
        tree.append_new(p, Node::Text(" from a file.".into()));
        tree.append_new(ds, Node::LiteralBlock("x = 1\ny = 2".into()));
        let fields = tree.append_new(ds, Node::FieldList);
        let field = tree.append_new(
            fields,
            Node::Field {
                name: "type".into(),
                body: "int".into(),
            },
        );
        let body = tree.append_new(field, Node::Paragraph);
        tree.append_new(body, Node::Text("int".into()));
        tree.append_new(
            ds,
            Node::Message(Diagnostic::warning("hidden", 1)),
        );

        assert_eq!(
            tree.text(ds),
            "Title\n=====\n\n\
             Loads :data:`globalDict <bge.logic.globalDict>` from a file.\n\n    \
             x = 1\n    y = 2\n\n\
             :type: int"
        );
        assert_eq!(tree.diagnostics(ds).len(), 1);
    }
}
