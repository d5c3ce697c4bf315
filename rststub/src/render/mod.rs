//! Renderer module: trait-based format dispatch.

pub mod json;
pub mod stub;

use crate::error::{Error, Result};
use crate::model::{Node, NodeId, Tree};

/// Trait for rendering an assembled document into a specific output format.
pub trait Renderer: Send + Sync {
    /// Render `tree`. `source` names the unit in forwarded diagnostics.
    fn render(&self, tree: &Tree, source: &str) -> String;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "stub" | "pyi" => Ok(Box::new(stub::StubRenderer)),
        "json" => Ok(Box::new(json::JsonRenderer)),
        _ => Err(Error::UnknownFormat(format.to_string())),
    }
}

/// The module a document renders, or the document itself when it has none.
fn scope_of(tree: &Tree) -> NodeId {
    let root = tree.root();
    tree.first_child(root, |n| matches!(n, Node::Module(_)))
        .unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_formats() {
        assert_eq!(create_renderer("stub").unwrap().file_extension(), "pyi");
        assert_eq!(create_renderer("pyi").unwrap().file_extension(), "pyi");
        assert_eq!(create_renderer("json").unwrap().file_extension(), "json");
    }

    #[test]
    fn unknown_format() {
        let err = create_renderer("markdown").err().unwrap();
        assert_eq!(err.to_string(), "unknown format: markdown. Use stub or json");
    }
}
