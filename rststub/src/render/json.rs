//! JSON renderer: structured output for tooling integration.
//!
//! Serializes the assembled module: imports, members with their resolved
//! types, and every diagnostic collected while reading the source.

use serde::Serialize;

use super::{scope_of, Renderer};
use crate::diagnostics::Diagnostic;
use crate::model::{Node, NodeId, Scope, Tree};

pub struct JsonRenderer;

#[derive(Serialize)]
struct ModuleView<'a> {
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docstring: Option<String>,
    imports: Vec<String>,
    members: Vec<MemberView<'a>>,
    diagnostics: Vec<&'a Diagnostic>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum MemberView<'a> {
    Data {
        name: &'a str,
        #[serde(rename = "type")]
        type_info: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        docstring: Option<String>,
    },
    Property {
        name: &'a str,
        #[serde(rename = "type")]
        type_info: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        docstring: Option<String>,
    },
    Function {
        name: &'a str,
        scope: Scope,
        #[serde(rename = "type")]
        type_info: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        returns: Option<&'a str>,
        arguments: Vec<ArgumentView<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        docstring: Option<String>,
    },
    Class {
        name: &'a str,
        bases: &'a [String],
        members: Vec<MemberView<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        docstring: Option<String>,
    },
}

#[derive(Serialize)]
struct ArgumentView<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_info: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<&'a str>,
}

impl Renderer for JsonRenderer {
    fn render(&self, tree: &Tree, source: &str) -> String {
        let scope = scope_of(tree);
        let view = ModuleView {
            name: tree.name(scope),
            docstring: docstring(tree, scope),
            imports: tree
                .imports(scope)
                .iter()
                .filter_map(|i| match tree.node(*i) {
                    Node::Import(import) => Some(import.text()),
                    _ => None,
                })
                .collect(),
            members: members(tree, scope),
            diagnostics: tree.diagnostics(tree.root()),
        };

        match serde_json::to_string_pretty(&view) {
            Ok(mut out) => {
                out.push('\n');
                out
            }
            Err(err) => {
                tracing::error!("{source}: failed to serialize: {err}");
                String::new()
            }
        }
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

fn members(tree: &Tree, id: NodeId) -> Vec<MemberView<'_>> {
    tree.members(id)
        .into_iter()
        .filter_map(|m| member(tree, m))
        .collect()
}

fn member(tree: &Tree, id: NodeId) -> Option<MemberView<'_>> {
    let node = tree.node(id);
    let name = node.name()?;
    let type_info = node.type_info();
    let docstring = docstring(tree, id);

    let view = match node {
        Node::Data(_) => MemberView::Data {
            name,
            type_info,
            docstring,
        },
        Node::Property(_) => MemberView::Property {
            name,
            type_info,
            docstring,
        },
        Node::Function(function) => MemberView::Function {
            name,
            scope: function.scope,
            type_info,
            returns: function.returns(),
            arguments: tree
                .arguments(id)
                .into_iter()
                .filter_map(|a| match tree.node(a) {
                    Node::Argument(argument) => Some(ArgumentView {
                        name: tree.name(a)?,
                        type_info: tree.node(a).type_info(),
                        default: argument.default_value(),
                    }),
                    _ => None,
                })
                .collect(),
            docstring,
        },
        Node::Class(class) => MemberView::Class {
            name,
            bases: class.base_types(),
            members: members(tree, id),
            docstring,
        },
        _ => return None,
    };
    Some(view)
}

fn docstring(tree: &Tree, id: NodeId) -> Option<String> {
    let text = tree.text(tree.docstring(id)?);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
