//! Markup reading: text → blocks → document tree.

pub mod inline;
pub mod rst;

use crate::directive::Builder;
use crate::model::Tree;

/// Parse a reStructuredText document and run every directive in it.
pub fn parse_document(text: &str) -> Tree {
    let blocks = rst::read(text);
    let mut tree = Tree::new();
    let root = tree.root();
    Builder::new(&mut tree).build(root, &blocks);
    tree
}
