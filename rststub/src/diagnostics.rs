//! Non-fatal findings attached to the document tree.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// A finding produced while interpreting a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    /// 1-based source line of the directive, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            level,
            message: message.into(),
            line,
        }
    }

    pub fn warning(message: impl Into<String>, line: usize) -> Self {
        Self::new(Level::Warning, message, Some(line))
    }

    pub fn error(message: impl Into<String>, line: usize) -> Self {
        Self::new(Level::Error, message, Some(line))
    }

    /// Forward to the log at the matching severity.
    pub fn emit(&self, source: &str) {
        match self.level {
            Level::Info => tracing::info!("{source}: {self}"),
            Level::Warning => tracing::warn!("{source}: {self}"),
            Level::Error => tracing::error!("{source}: {self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
