//! Declaration line parser: `name(arg1, arg2=default[, opt1[, opt2]])`.
//!
//! Optional brackets are flattened. Every parameter that opens inside an
//! optional group and carries no explicit default gets `None`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("empty signature")]
    Empty,
    #[error("missing parameter list in {0:?}")]
    MissingParens(String),
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("invalid parameter {param:?} in {line:?}")]
    InvalidParam { param: String, line: String },
    #[error("unbalanced brackets in {0:?}")]
    Unbalanced(String),
    #[error("unexpected text after parameter list in {0:?}")]
    Trailing(String),
}

/// A single parameter. Variadic markers keep their stars in `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Default value as written, never evaluated.
    pub default: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.name.starts_with('*')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    /// Whether the line had a parameter list at all (`Foo` vs `Foo()`).
    pub parenthesized: bool,
}

/// Parse a function or method declaration line.
///
/// Accepts a trailing `:` and a `-> type` annotation, both ignored.
pub fn parse_signature(line: &str) -> Result<Signature, SignatureError> {
    let sig = parse_line(line, false)?;
    if !sig.parenthesized {
        return Err(SignatureError::MissingParens(line.trim().to_string()));
    }
    Ok(sig)
}

/// Parse a class declaration line: `Name`, `Name(Base, mod.Base)` or
/// `Name(arg, opt=1)`. Parameter names may be dotted since the list can
/// hold base classes; the caller decides which reading applies.
pub fn parse_class_signature(line: &str) -> Result<Signature, SignatureError> {
    parse_line(line, true)
}

/// Split a directive argument into one declaration per line.
/// A trailing backslash joins a line with the next.
pub fn split_overloads(argument: &str) -> Vec<String> {
    argument
        .replace("\\\n", " ")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_line(line: &str, dotted: bool) -> Result<Signature, SignatureError> {
    let text = line.trim();
    let text = text.strip_suffix(':').unwrap_or(text).trim_end();
    if text.is_empty() {
        return Err(SignatureError::Empty);
    }

    let Some(open) = text.find('(') else {
        if !is_identifier(text) {
            return Err(SignatureError::InvalidName(text.to_string()));
        }
        return Ok(Signature {
            name: text.to_string(),
            params: Vec::new(),
            parenthesized: false,
        });
    };

    let name = text[..open].trim();
    if !is_identifier(name) {
        return Err(SignatureError::InvalidName(name.to_string()));
    }

    let close = matching_paren(text, open)
        .ok_or_else(|| SignatureError::Unbalanced(text.to_string()))?;

    let rest = text[close + 1..].trim();
    if !rest.is_empty() && !rest.starts_with("->") {
        return Err(SignatureError::Trailing(text.to_string()));
    }

    let params = parse_params(&text[open + 1..close], text, dotted)?;
    Ok(Signature {
        name: name.to_string(),
        params,
        parenthesized: true,
    })
}

/// Byte index of the `)` closing the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// -- Parameter scanner --------------------------------------------------------

#[derive(Default)]
struct Pending {
    text: String,
    optional: bool,
}

impl Pending {
    fn push(&mut self, c: char, optional_depth: usize) {
        if self.text.trim().is_empty() && !c.is_whitespace() {
            self.optional = optional_depth > 0;
        }
        self.text.push(c);
    }
}

fn parse_params(inner: &str, line: &str, dotted: bool) -> Result<Vec<Param>, SignatureError> {
    let unbalanced = || SignatureError::Unbalanced(line.to_string());

    let chars: Vec<char> = inner.chars().collect();
    let mut pieces: Vec<Pending> = Vec::new();
    let mut current = Pending::default();
    let mut group = 0usize;
    let mut optional = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            current.push(c, optional);
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c, optional);
            }
            '(' | '{' => {
                group += 1;
                current.push(c, optional);
            }
            ')' | '}' => {
                group = group.checked_sub(1).ok_or_else(unbalanced)?;
                current.push(c, optional);
            }
            '[' if group == 0 && opens_optional(&current.text, &chars[i + 1..]) => {
                optional += 1;
            }
            '[' => {
                group += 1;
                current.push(c, optional);
            }
            ']' if group > 0 => {
                group -= 1;
                current.push(c, optional);
            }
            ']' => {
                optional = optional.checked_sub(1).ok_or_else(unbalanced)?;
            }
            ',' if group == 0 => {
                pieces.push(std::mem::take(&mut current));
            }
            _ => current.push(c, optional),
        }
    }

    if quote.is_some() || group != 0 || optional != 0 {
        return Err(unbalanced());
    }
    pieces.push(current);

    // A trailing comma leaves one empty piece behind.
    if pieces.last().is_some_and(|p| p.text.trim().is_empty()) {
        pieces.pop();
    }

    let mut params = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Some(param) = parse_param(&piece, line, dotted)? {
            params.push(param);
        }
    }
    Ok(params)
}

/// A `[` starts an optional group when nothing precedes it in the current
/// parameter or when it is immediately followed by a comma (`a[, b]`).
fn opens_optional(current: &str, after: &[char]) -> bool {
    if current.trim().is_empty() {
        return true;
    }
    after.iter().find(|c| !c.is_whitespace()) == Some(&',')
}

fn parse_param(piece: &Pending, line: &str, dotted: bool) -> Result<Option<Param>, SignatureError> {
    let invalid = || SignatureError::InvalidParam {
        param: piece.text.trim().to_string(),
        line: line.to_string(),
    };

    let text = piece.text.trim();
    match text {
        "" => return Err(invalid()),
        "/" => return Ok(None),
        "*" => return Ok(Some(Param::new("*args"))),
        _ => {}
    }

    let (head, default) = match text.split_once('=') {
        Some((head, default)) => {
            let default = default.trim();
            if default.is_empty() {
                return Err(invalid());
            }
            (head.trim(), Some(default.to_string()))
        }
        None => (text, None),
    };

    // Annotations are dropped; the field list carries the types.
    let head = head.split_once(':').map_or(head, |(name, _)| name).trim();

    let (stars, bare) = if let Some(bare) = head.strip_prefix("**") {
        ("**", bare)
    } else if let Some(bare) = head.strip_prefix('*') {
        ("*", bare)
    } else {
        ("", head)
    };

    let valid = if dotted && stars.is_empty() {
        bare.split('.').all(is_identifier)
    } else {
        is_identifier(bare)
    };
    if !valid || (!stars.is_empty() && default.is_some()) {
        return Err(invalid());
    }

    let default = match default {
        Some(default) => Some(default),
        None if piece.optional && stars.is_empty() => Some("None".to_string()),
        None => None,
    };

    Ok(Some(Param {
        name: format!("{stars}{bare}"),
        default,
    }))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
