//! rststub: typed Python stubs from reStructuredText API references.
//!
//! A document goes through four stages:
//!
//! 1. [`parser`] reads the markup and [`directive`] turns API directives into
//!    [`model`] nodes, collecting [`diagnostics`] along the way.
//! 2. [`assembly`] promotes members into the module, imports referenced
//!    modules, orders classes by dependency and localises names.
//! 3. [`patch`] overlays hand-written corrections.
//! 4. [`render`] prints the `.pyi` stub or a JSON view.
//!
//! [`task`] drives the stages over a whole directory of sources.

pub mod assembly;
pub mod diagnostics;
pub mod directive;
pub mod error;
pub mod model;
pub mod parser;
pub mod patch;
pub mod render;
pub mod task;

pub use error::{Error, Result};
pub use parser::parse_document;
pub use patch::Patches;
pub use task::{convert, generate, GenerateConfig, Summary};
