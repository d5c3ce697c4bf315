//! Cross-reference roles.
//!
//! A reference carries the raw role text (`~bpy.types.Object`,
//! `!Object`, `Title <bpy.types.Object>`) plus the role it appeared under.
//! Two display-control prefixes are recognized:
//!
//! - `~` shows only the last dotted segment but links to the full name
//! - `!` suppresses the link and emits the text verbatim

use std::fmt;

/// The role a reference is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Class,
    Module,
    Function,
    Data,
    Property,
    Method,
    Attribute,
}

impl RefKind {
    pub const ALL: [RefKind; 7] = [
        RefKind::Class,
        RefKind::Module,
        RefKind::Function,
        RefKind::Data,
        RefKind::Property,
        RefKind::Method,
        RefKind::Attribute,
    ];

    /// Role name as written in markup (`class` in `:class:`).
    pub fn role(self) -> &'static str {
        match self {
            RefKind::Class => "class",
            RefKind::Module => "mod",
            RefKind::Function => "func",
            RefKind::Data => "data",
            RefKind::Property => "prop",
            RefKind::Method => "meth",
            RefKind::Attribute => "attr",
        }
    }

    /// Resolve a role name. Accepts both the short and the spelled-out form
    /// (`mod` and `module`, `meth` and `method`).
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "class" => Some(RefKind::Class),
            "mod" | "module" => Some(RefKind::Module),
            "func" | "function" => Some(RefKind::Function),
            "data" => Some(RefKind::Data),
            "prop" | "property" => Some(RefKind::Property),
            "meth" | "method" => Some(RefKind::Method),
            "attr" | "attribute" => Some(RefKind::Attribute),
            _ => None,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

/// How a reference is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Full qualified name as both text and link.
    Plain,
    /// Last segment as text, full name as link (`~` prefix).
    Shortened,
    /// Verbatim text, no link (`!` prefix).
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    kind: RefKind,
    text: String,
}

impl Reference {
    pub fn new(kind: RefKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// A `~`-prefixed reference to `name`.
    pub fn shortened(kind: RefKind, name: &str) -> Self {
        Self::new(kind, format!("~{name}"))
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// Raw text including any display-control prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> RenderMode {
        match self.text.chars().next() {
            Some('~') => RenderMode::Shortened,
            Some('!') => RenderMode::Literal,
            _ => RenderMode::Plain,
        }
    }

    /// Text with the display-control prefix removed.
    fn body(&self) -> &str {
        self.text
            .strip_prefix('~')
            .or_else(|| self.text.strip_prefix('!'))
            .unwrap_or(self.text.as_str())
    }

    /// The linked name with prefixes and any `Title <...>` alias removed.
    pub fn target(&self) -> &str {
        let name = self.body();
        match split_alias(name) {
            Some((_, target)) => target,
            None => name.trim(),
        }
    }

    /// Text shown to a reader.
    pub fn display(&self) -> &str {
        if let Some((title, _)) = split_alias(self.body()) {
            return title;
        }
        let target = self.target();
        match self.mode() {
            RenderMode::Shortened => target.rsplit('.').next().unwrap_or(target),
            RenderMode::Plain | RenderMode::Literal => target,
        }
    }

    /// Render back into role markup.
    pub fn render(&self) -> String {
        let role = self.kind.role();
        match self.mode() {
            RenderMode::Literal => self.display().to_string(),
            RenderMode::Plain if split_alias(self.body()).is_none() => {
                format!(":{role}:`{}`", self.target())
            }
            RenderMode::Plain | RenderMode::Shortened => {
                format!(":{role}:`{} <{}>`", self.display(), self.target())
            }
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// `Title <a.b.C>` → `("Title", "a.b.C")`
fn split_alias(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let inner = text.strip_suffix('>')?;
    let open = inner.rfind('<')?;
    let title = inner[..open].trim();
    let target = inner[open + 1..].trim();
    if title.is_empty() || target.is_empty() {
        return None;
    }
    Some((title, target))
}
