//! `.. data::`, `.. attribute::` and `.. property::`.

use rststub_syntax::{parse_type, ANY};

use super::{collapse, Builder};
use crate::diagnostics::Diagnostic;
use crate::model::{Data, Node, NodeId, Property};
use crate::parser::rst::Directive;

pub(super) fn run(builder: &mut Builder, directive: &Directive, property: bool) -> Vec<NodeId> {
    let info = builder.parse_docstring(directive);
    let name = collapse(&directive.argument);
    let label = if property { "Property" } else { "Data" };

    if name.is_empty() {
        let message = builder.message(Diagnostic::error(
            format!("{label} directive without a name"),
            directive.line,
        ));
        return vec![message];
    }

    let mut messages = Vec::new();
    let type_info = match info.fields.get("type") {
        Some(text) => parse_type(text).unwrap_or_else(|| {
            messages.push(Diagnostic::warning(
                format!("{label} {name} has invalid type: {text}"),
                directive.line,
            ));
            ANY.to_string()
        }),
        None => ANY.to_string(),
    };

    let mut node = if property {
        Node::Property(Property::new(&name))
    } else {
        Node::Data(Data::new(&name))
    };
    if let Some(typed) = node.as_typed_mut() {
        typed.set_type(Some(type_info));
    }

    let member = builder.tree.create(node);
    builder.attach_docstring(member, info.docstring);

    let mut produced = vec![member];
    for diagnostic in messages {
        produced.push(builder.message(diagnostic));
    }
    produced.extend(info.remainder);
    produced
}
