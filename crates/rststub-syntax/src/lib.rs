//! Syntax helpers shared by the rststub pipeline.
//!
//! Everything here is a pure function of its input text:
//!
//! - [`types`]: free-text type descriptions → typing expressions
//! - [`reference`]: cross-reference roles (`:class:`...``) and their rendering
//! - [`signature`]: `name(arg, opt=1[, extra])` declaration lines

pub mod reference;
pub mod signature;
pub mod types;

pub use reference::{RefKind, Reference, RenderMode};
pub use signature::{
    parse_class_signature, parse_signature, split_overloads, Param, Signature, SignatureError,
};
pub use types::{is_builtin, parse_type, primitive, ANY};
