//! `.. class::`: bases, constructor synthesis and nested members.

use rststub_syntax::{parse_class_signature, RefKind};

use super::{collapse, function, Builder};
use crate::diagnostics::Diagnostic;
use crate::model::{Class, Function, Node, NodeId, Scope, Typed};
use crate::parser::rst::Directive;

/// Field names that document a constructor parameter.
const PARAM_FIELDS: &[&str] = &["arg", "param", "parameter", "type"];

pub(super) fn run(builder: &mut Builder, parent: NodeId, directive: &Directive) -> Vec<NodeId> {
    // The directive has not been appended yet, so the parent's last child is
    // the block right above it.
    let declared_bases = builder
        .tree
        .children(parent)
        .last()
        .copied()
        .and_then(|id| base_class_paragraph(builder, id));

    let info = builder.parse_docstring(directive);
    let line = directive.line;
    let argument = collapse(&directive.argument);

    let signature = match parse_class_signature(&argument) {
        Ok(signature) => signature,
        Err(err) => {
            let message = builder.message(Diagnostic::error(
                format!("Invalid class signature: {argument} ({err})"),
                line,
            ));
            return vec![message];
        }
    };

    let documents_params = info.fields.keys().any(|key| {
        key.split_whitespace()
            .next()
            .is_some_and(|word| PARAM_FIELDS.contains(&word))
    });
    let constructor_like = signature.parenthesized
        && (documents_params
            || signature
                .params
                .iter()
                .any(|p| p.default.is_some() || p.is_variadic()));

    let mut class = Class::new(&signature.name);
    let mut messages = Vec::new();
    let mut constructor = None;

    if constructor_like {
        let mut init = Function::new("__init__", Scope::Instance);
        init.set_type(Some("None".to_string()));
        let init = builder.tree.create(Node::Function(init));

        if let Some(list) = info.field_list {
            let docstring = builder.tree.create(Node::DocString);
            builder.tree.append(docstring, list);
            builder.attach_docstring(init, docstring);
        }

        let (arguments, argument_messages) =
            function::arguments(&signature.params, &info.fields, &["self"], line);
        for argument in arguments {
            builder.tree.append_new(init, Node::Argument(argument));
        }
        messages.extend(argument_messages);
        constructor = Some(init);
    }

    match declared_bases {
        Some(bases) => class.set_base_types(bases),
        None if signature.parenthesized && !constructor_like => {
            class.set_base_types(signature.params.iter().map(|p| p.name.clone()));
        }
        None => {}
    }

    let member = builder.tree.create(Node::Class(class));
    builder.attach_docstring(member, info.docstring);
    if let Some(init) = constructor {
        builder.tree.append(member, init);
    }
    for id in info.remainder {
        // Plain functions declared inside a class are methods.
        if let Node::Function(function) = builder.tree.node_mut(id) {
            if function.scope == Scope::Module {
                function.scope = Scope::Instance;
            }
        }
        builder.tree.append(member, id);
    }

    let mut produced = vec![member];
    for diagnostic in messages {
        produced.push(builder.message(diagnostic));
    }
    produced
}

/// Class reference targets of a "Base class(es) ..." paragraph.
fn base_class_paragraph(builder: &Builder, id: NodeId) -> Option<Vec<String>> {
    let tree = &*builder.tree;
    if !matches!(tree.node(id), Node::Paragraph) {
        return None;
    }
    if !tree.text(id).trim().to_lowercase().starts_with("base class") {
        return None;
    }
    let bases = tree
        .children(id)
        .iter()
        .filter_map(|c| match tree.node(*c) {
            Node::Reference(reference) if reference.kind() == RefKind::Class => {
                Some(reference.target().to_string())
            }
            _ => None,
        })
        .collect();
    Some(bases)
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::Level;
    use crate::model::{Node, NodeId, Scope, Tree};
    use crate::parser::parse_document;

    fn class(tree: &Tree) -> NodeId {
        tree.classes(tree.root())[0]
    }

    fn bases(tree: &Tree, id: NodeId) -> Vec<String> {
        match tree.node(id) {
            Node::Class(class) => class.base_types().to_vec(),
            other => panic!("not a class: {other:?}"),
        }
    }

    #[test]
    fn documented_parameters_make_a_constructor() {
        let source = "\
.. class:: Camera(name, position[, fov])

   A camera.

   :arg name: The name.
   :type name: string
   :arg position: Where it stands.
   :type position: :class:`mathutils.Vector`
   :type fov: float

   .. method:: look()

      Look around.

   .. function:: helper()
";
        let tree = parse_document(source);
        let camera = class(&tree);
        assert!(bases(&tree, camera).is_empty());
        assert_eq!(tree.text(tree.docstring(camera).unwrap()), "A camera.");

        let members = tree.members(camera);
        let names: Vec<&str> = members.iter().filter_map(|m| tree.name(*m)).collect();
        assert_eq!(names, ["__init__", "look", "helper"]);

        let init = members[0];
        assert_eq!(tree.node(init).type_info(), Some("None"));
        assert_eq!(
            tree.signature(init).unwrap(),
            "def __init__(self, name: str, position: mathutils.Vector, \
             fov: float = None) -> None:"
        );
        let fields = tree.text(tree.docstring(init).unwrap());
        assert!(fields.starts_with(":arg name: The name."));

        for member in &members[1..] {
            match tree.node(*member) {
                Node::Function(f) => assert_eq!(f.scope, Scope::Instance),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(tree.diagnostics(tree.root()).is_empty());
    }

    #[test]
    fn exactly_one_constructor() {
        let source = "\
.. class:: Buffer(type, dimensions, template=None)

   :arg type: The buffer type.
   :type type: int
";
        let tree = parse_document(source);
        let buffer = class(&tree);
        let inits: Vec<NodeId> = tree
            .members(buffer)
            .into_iter()
            .filter(|m| tree.name(*m) == Some("__init__"))
            .collect();
        assert_eq!(inits.len(), 1);
        let args: Vec<&str> = tree
            .arguments(inits[0])
            .iter()
            .filter_map(|a| tree.name(*a))
            .collect();
        assert_eq!(args, ["type", "dimensions", "template"]);
    }

    #[test]
    fn parenthesized_names_are_bases_without_fields() {
        let tree = parse_document(
            ".. class:: KX_GameObject(SCA_IObject, bge.types.KX_Base)\n\n   A game object.\n",
        );
        let object = class(&tree);
        assert_eq!(bases(&tree, object), ["SCA_IObject", "bge.types.KX_Base"]);
        assert!(tree.members(object).is_empty());
        assert_eq!(
            tree.signature(object).unwrap(),
            "class KX_GameObject(SCA_IObject, bge.types.KX_Base):"
        );
    }

    #[test]
    fn base_class_paragraph_wins() {
        let source = "\
base classes --- :class:`bge.types.SCA_IObject`, :class:`bge.types.KX_Base`

.. class:: KX_GameObject(name)

   :type name: str
";
        let tree = parse_document(source);
        let object = class(&tree);
        assert_eq!(
            bases(&tree, object),
            ["bge.types.SCA_IObject", "bge.types.KX_Base"]
        );
        // The documented field still makes a constructor.
        assert_eq!(tree.name(tree.members(object)[0]), Some("__init__"));
    }

    #[test]
    fn unrelated_paragraph_is_not_a_base_list() {
        let tree = parse_document("See :class:`Other`.\n\n.. class:: Thing(Base)\n");
        assert_eq!(bases(&tree, class(&tree)), ["Base"]);
    }

    #[test]
    fn class_never_lists_itself() {
        let tree = parse_document(".. class:: Node(Node, Base)\n");
        assert_eq!(bases(&tree, class(&tree)), ["Base"]);
    }

    #[test]
    fn bare_class() {
        let tree = parse_document(".. class:: Plain\n\n   .. attribute:: value\n\n      :type: int\n");
        let plain = class(&tree);
        assert_eq!(tree.signature(plain).unwrap(), "class Plain:");
        assert_eq!(tree.members(plain).len(), 1);
    }

    #[test]
    fn invalid_signature_keeps_going() {
        let tree = parse_document(".. class:: 3DView()\n\n.. class:: Next\n");
        let classes = tree.classes(tree.root());
        assert_eq!(classes.len(), 1);
        assert_eq!(tree.name(classes[0]), Some("Next"));
        let diagnostics = tree.diagnostics(tree.root());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, Level::Error);
        assert!(diagnostics[0].message.starts_with("Invalid class signature: 3DView()"));
    }
}
