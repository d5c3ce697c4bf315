//! Directive interpreters: turn `.. data::`, `.. function::`, `.. class::`
//! blocks into model nodes.
//!
//! [`Builder`] walks the block list, copies narrative into the tree and
//! hands each directive to its interpreter. Interpreters never fail; a bad
//! signature or type becomes a [`Node::Message`] next to the member.

mod class;
mod data;
mod function;

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::model::{Module, Node, NodeId, Scope, Tree};
use crate::parser::inline::{parse_inline, Inline};
use crate::parser::rst::{Block, Directive};

pub struct Builder<'t> {
    tree: &'t mut Tree,
}

/// A member directive's body split into its parts.
struct DocStringInfo {
    /// Narrative content; may be empty.
    docstring: NodeId,
    /// First field list flattened to `name → text`, plus directive options.
    fields: HashMap<String, String>,
    /// The field list node removed from the docstring.
    field_list: Option<NodeId>,
    /// Nested members and their diagnostics, in order.
    remainder: Vec<NodeId>,
}

impl<'t> Builder<'t> {
    pub fn new(tree: &'t mut Tree) -> Self {
        Self { tree }
    }

    /// Append nodes for `blocks` to `parent`.
    pub fn build(&mut self, parent: NodeId, blocks: &[Block]) {
        for block in blocks {
            self.block(parent, block);
        }
    }

    fn block(&mut self, parent: NodeId, block: &Block) {
        match block {
            Block::Paragraph { text, .. } => {
                let paragraph = self.tree.append_new(parent, Node::Paragraph);
                for inline in parse_inline(text) {
                    let node = match inline {
                        Inline::Text(text) => Node::Text(text),
                        Inline::Ref(reference) => Node::Reference(reference),
                    };
                    self.tree.append_new(paragraph, node);
                }
            }
            Block::Title { text, marker, .. } => {
                self.tree.append_new(
                    parent,
                    Node::Title {
                        text: text.clone(),
                        marker: *marker,
                    },
                );
            }
            Block::Literal { text, .. } => {
                self.tree.append_new(parent, Node::LiteralBlock(text.clone()));
            }
            Block::Quote { blocks, .. } => {
                let quote = self.tree.append_new(parent, Node::Indented);
                self.build(quote, blocks);
            }
            Block::FieldList { fields, .. } => {
                let list = self.tree.append_new(parent, Node::FieldList);
                for field in fields {
                    let node = self.tree.append_new(
                        list,
                        Node::Field {
                            name: field.name.clone(),
                            body: field.body.clone(),
                        },
                    );
                    self.build(node, &field.blocks);
                }
            }
            Block::Comment { .. } => {}
            Block::Directive(directive) => self.directive(parent, directive),
        }
    }

    fn directive(&mut self, parent: NodeId, directive: &Directive) {
        let name = directive
            .name
            .strip_prefix("py:")
            .unwrap_or(directive.name.as_str());

        let produced = match name {
            "module" => {
                let module = Module::new(&collapse(&directive.argument));
                self.tree.append_new(parent, Node::Module(module));
                // Module content flows on as ordinary narrative.
                self.build(parent, &directive.content);
                Vec::new()
            }
            "currentmodule" => Vec::new(),
            "data" | "attribute" => data::run(self, directive, false),
            "property" => data::run(self, directive, true),
            "function" | "method" | "classmethod" | "staticmethod" => {
                function::run(self, directive, Scope::from_directive(name))
            }
            "class" => class::run(self, parent, directive),
            _ => vec![self.tree.create(Node::Raw(directive.raw.clone()))],
        };

        for id in produced {
            self.tree.append(parent, id);
        }
    }

    /// Build the directive content into a detached docstring and pull out
    /// nested members and the first field list.
    fn parse_docstring(&mut self, directive: &Directive) -> DocStringInfo {
        let docstring = self.tree.create(Node::DocString);
        self.build(docstring, &directive.content);

        let remainder: Vec<NodeId> = self
            .tree
            .children(docstring)
            .iter()
            .copied()
            .filter(|c| {
                let node = self.tree.node(*c);
                node.is_member() || matches!(node, Node::Message(_))
            })
            .collect();
        for id in &remainder {
            self.tree.detach(*id);
        }

        let mut fields = HashMap::new();
        let field_list = self
            .tree
            .first_child(docstring, |n| matches!(n, Node::FieldList));
        if let Some(list) = field_list {
            for field in self.tree.children(list) {
                if let Node::Field { name, body } = self.tree.node(*field) {
                    fields.insert(name.clone(), body.clone());
                }
            }
            self.tree.detach(list);
        }
        for (name, value) in &directive.options {
            fields.entry(name.clone()).or_insert_with(|| value.clone());
        }

        DocStringInfo {
            docstring,
            fields,
            field_list,
            remainder,
        }
    }

    /// Attach the docstring to `member` as its first child when non-empty.
    fn attach_docstring(&mut self, member: NodeId, docstring: NodeId) {
        if !self.tree.children(docstring).is_empty() {
            self.tree.insert(member, 0, docstring);
        }
    }

    fn message(&mut self, diagnostic: Diagnostic) -> NodeId {
        self.tree.create(Node::Message(diagnostic))
    }
}

/// Join continuation lines and collapse runs of whitespace.
fn collapse(text: &str) -> String {
    text.replace("\\\n", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    #[test]
    fn narrative_blocks() {
        let tree = parse_document("Title\n=====\n\nSee :class:`bpy.types.Object`.\n\n.. note::\n\n   Raw.\n");
        let root = tree.root();
        let kinds: Vec<&str> = tree
            .children(root)
            .iter()
            .map(|c| tree.node(*c).kind())
            .collect();
        assert_eq!(kinds, ["title", "paragraph", "raw"]);
        assert_eq!(
            tree.text(root),
            "Title\n=====\n\nSee :class:`bpy.types.Object`.\n\n.. note::\n\n   Raw."
        );
    }

    #[test]
    fn module_directive() {
        let tree = parse_document(".. module::   bpy.ops.logic   \n");
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        let module = tree.children(root)[0];
        assert_eq!(tree.name(module), Some("bpy.ops.logic"));
    }

    #[test]
    fn currentmodule_and_comments_vanish() {
        let tree = parse_document(".. currentmodule:: bge.types\n\n.. comment\n");
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn unknown_py_domain_prefix() {
        let tree = parse_document(".. py:data:: x\n\n   :type: int\n");
        let root = tree.root();
        let data = tree.children(root)[0];
        assert_eq!(tree.node(data).type_info(), Some("int"));
    }

    #[test]
    fn collapse_whitespace() {
        assert_eq!(collapse("Buffer(a,\\\n   b)"), "Buffer(a, b)");
        assert_eq!(collapse("  x  "), "x");
    }
}
