//! Library error type.
//!
//! Per-member problems are [`Diagnostic`](crate::diagnostics::Diagnostic)
//! values attached to the tree. `Error` is reserved for unit-level failures
//! and broken tree contracts.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading a source or writing a stub failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A parsed document has no `.. module::` directive.
    #[error("missing module element in {0}")]
    MissingModule(String),

    /// The `--pattern` value is not a valid glob.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A patch directory or patch document could not be loaded.
    #[error("failed to load patch {path}: {reason}")]
    Patch { path: PathBuf, reason: String },

    /// A member node reached rendering without a name.
    #[error("{kind} node does not have a name")]
    MissingName { kind: &'static str },

    /// Only data, properties, functions and classes have a declaration.
    #[error("{0} node has no signature")]
    NoSignature(&'static str),

    #[error("unknown format: {0}. Use stub or json")]
    UnknownFormat(String),

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
