//! Inline markup: cross-reference roles inside paragraph text.

use regex::Regex;
use rststub_syntax::{RefKind, Reference};
use std::sync::LazyLock;

static RE_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(?:py:)?(?P<role>[a-z]+):`(?P<body>[^`]+)`").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Ref(Reference),
}

/// Split text into plain runs and references. Unknown roles stay text.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut result = Vec::new();
    let mut plain = String::new();
    let mut last = 0;

    for caps in RE_ROLE.captures_iter(text) {
        let Some(kind) = RefKind::from_role(&caps["role"]) else {
            continue;
        };
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        plain.push_str(&text[last..whole.start]);
        if !plain.is_empty() {
            result.push(Inline::Text(std::mem::take(&mut plain)));
        }
        result.push(Inline::Ref(Reference::new(kind, caps["body"].trim())));
        last = whole.end;
    }

    plain.push_str(&text[last..]);
    if !plain.is_empty() {
        result.push(Inline::Text(plain));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text() {
        assert_eq!(
            parse_inline("no markup here"),
            [Inline::Text("no markup here".into())]
        );
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn references() {
        let parsed = parse_inline("Loads :class:`~bge.logic.globalDict` from a file.");
        assert_eq!(
            parsed,
            [
                Inline::Text("Loads ".into()),
                Inline::Ref(Reference::new(RefKind::Class, "~bge.logic.globalDict")),
                Inline::Text(" from a file.".into()),
            ]
        );
    }

    #[test]
    fn every_python_role() {
        let parsed = parse_inline(":mod:`a` :func:`b` :meth:`c` :data:`d` :attr:`e` :prop:`f`");
        let kinds: Vec<RefKind> = parsed
            .iter()
            .filter_map(|i| match i {
                Inline::Ref(r) => Some(r.kind()),
                Inline::Text(_) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            [
                RefKind::Module,
                RefKind::Function,
                RefKind::Method,
                RefKind::Data,
                RefKind::Attribute,
                RefKind::Property,
            ]
        );
    }

    #[test]
    fn domain_prefix_and_unknown_roles() {
        let parsed = parse_inline("see :py:class:`Object` and :kbd:`Ctrl`");
        assert_eq!(
            parsed,
            [
                Inline::Text("see ".into()),
                Inline::Ref(Reference::new(RefKind::Class, "Object")),
                Inline::Text(" and :kbd:`Ctrl`".into()),
            ]
        );
    }
}
