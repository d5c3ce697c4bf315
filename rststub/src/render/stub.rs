//! Python stub (`.pyi`) renderer.
//!
//! Each member prints its declaration from [`Tree::signature`]. Members with
//! a body get an indented docstring followed by their children, or `...`.
//! Data members have no body, so their docstring sits on the next line at
//! the same indentation.

use tracing::warn;

use super::{scope_of, Renderer};
use crate::model::{indent, Node, NodeId, Tree};

const INDENT: &str = "    ";

pub struct StubRenderer;

impl Renderer for StubRenderer {
    fn render(&self, tree: &Tree, source: &str) -> String {
        for diagnostic in tree.diagnostics(tree.root()) {
            diagnostic.emit(source);
        }

        let scope = scope_of(tree);
        let mut blocks = Vec::new();

        if let Some(docstring) = tree.docstring(scope).and_then(|d| docstring(tree, d)) {
            blocks.push(docstring);
        }

        let imports: Vec<String> = tree
            .imports(scope)
            .iter()
            .filter_map(|i| match tree.node(*i) {
                Node::Import(import) => Some(import.text()),
                _ => None,
            })
            .collect();
        if !imports.is_empty() {
            blocks.push(imports.join("\n"));
        }

        for member in tree.members(scope) {
            if let Some(block) = member_block(tree, member, source) {
                blocks.push(block);
            }
        }

        let mut output = blocks.join("\n\n");
        output.push('\n');
        output
    }

    fn file_extension(&self) -> &str {
        "pyi"
    }
}

fn member_block(tree: &Tree, id: NodeId, source: &str) -> Option<String> {
    let signature = match tree.signature(id) {
        Ok(signature) => signature,
        Err(err) => {
            warn!("{source}: ignoring member: {err}");
            return None;
        }
    };
    let docstring = tree.docstring(id).and_then(|d| docstring(tree, d));

    if !tree.has_body(id) {
        return Some(match docstring {
            Some(docstring) => format!("{signature}\n{docstring}"),
            None => signature,
        });
    }

    let mut body: Vec<String> = docstring.into_iter().collect();
    let body = match tree.node(id) {
        Node::Class(_) => {
            let members: Vec<String> = tree
                .members(id)
                .iter()
                .filter_map(|m| member_block(tree, *m, source))
                .collect();
            if members.is_empty() {
                body.push("...".to_string());
            } else {
                body.extend(members);
            }
            body.join("\n\n")
        }
        _ => {
            body.push("...".to_string());
            body.join("\n")
        }
    };

    Some(format!("{signature}\n{}", indent(&body, INDENT)))
}

/// Triple-quoted docstring literal, or `None` when there is no text.
fn docstring(tree: &Tree, id: NodeId) -> Option<String> {
    let text = tree.text(id);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut escaped = text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
    if escaped.ends_with('"') {
        escaped.pop();
        escaped.push_str("\\\"");
    }

    if escaped.contains('\n') {
        Some(format!("\"\"\"{escaped}\n\"\"\""))
    } else {
        Some(format!("\"\"\"{escaped}\"\"\""))
    }
}
