//! Free-text type description parser.
//!
//! API references describe types in prose: `int in [0, 10000], default 0`,
//! `list of :class:`Object``, `float array of 3 items`, `dict[str, int]`.
//! [`parse_type`] recognizes the common phrasings and returns a typing
//! expression such as `typing.List[bpy.types.Object]`.
//!
//! Rules are tried in a fixed order and the first match wins. Unrecognized
//! text yields `None`; the caller decides whether to fall back to [`ANY`].

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// The universal fallback type.
pub const ANY: &str = "typing.Any";

/// Geometry vector type used for `vector` phrasings.
pub const VECTOR: &str = "mathutils.Vector";

/// Collection type that supports both index and key access.
pub const PROP_COLLECTION: &str = "bpy.types.bpy_prop_collection";

/// Tuples longer than this collapse to `typing.Tuple[T, ...]`.
const MAX_UNROLLED: usize = 5;

// -- Regex patterns -----------------------------------------------------------

static RE_ARRAY_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)^(?P<data>[a-zA-Z]+)\sarray\sof\s(?P<count>[0-9]+)\sitems.*$").unwrap()
});

static RE_MULTI_ARRAY_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?si)^(?P<data>[a-zA-Z]+)\smulti-dimensional\sarray\sof\s",
        r"(?P<rows>[0-9]+)\s*\*\s*(?P<cols>[0-9]+)\sitems.*$"
    ))
    .unwrap()
});

static RE_QUALIFIED_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?si)^list\s*\([a-zA-Z0-9\s]*vector\sof\s[0-9]+\s(?P<data>[a-zA-Z]+)",
        r"(?:[,.\s][^)]*)?\)(?:[,.\s].*)?$"
    ))
    .unwrap()
});

static RE_LIST_BRACKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)^list\s*\[\s*(?::?class:`[~!]?(?P<reference>[^`]+)`",
        r"|(?P<data>[a-zA-Z_][a-zA-Z_0-9.]*))\s*\](?:[,.\s].*)?$"
    ))
    .unwrap()
});

static RE_CONTAINER_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)^(?:(?P<container>[a-zA-Z_]+)|:?class:`[~!]?(?P<container_ref>[^`]+)`)",
        r"\sof\s(?::?class:`[~!]?(?P<reference>[^`]+)`|(?P<data>[a-zA-Z]+))",
        r"(?P<qualifier>[',.\s].*)?$"
    ))
    .unwrap()
});

static RE_DICTIONARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^dict(?:ionary)?\s*[\[(](?P<key>[^,\s]+)\s*,\s*(?P<value>[^\])]+)[\])].*$",
    )
    .unwrap()
});

static RE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)^:?class:`[~!]?(?P<name>[a-zA-Z_0-9.\s]+?)",
        r"(?:\s*<(?P<target>[a-zA-Z_0-9.]+)>)?`(?P<rest>[,.\s].*)?$"
    ))
    .unwrap()
});

static RE_SIMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)^(?:unsigned\s)?(?P<type>[a-zA-Z]+)(?:\s?\([^)]+\))?",
        r"(?:\sin\s\[[^\]]+\])?(?P<rest>[,.\s].*)?$"
    ))
    .unwrap()
});

static RE_OR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+or\s+").unwrap());

// -- Vocabulary ---------------------------------------------------------------

static PRIMITIVES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("any", ANY),
        ("str", "str"),
        ("string", "str"),
        ("int", "int"),
        ("integer", "int"),
        ("float", "float"),
        ("double", "float"),
        ("bool", "bool"),
        ("boolean", "bool"),
        ("class", "typing.Type"),
        ("type", "typing.Type"),
        ("object", "bpy.types.Object"),
        ("callable", "typing.Callable"),
        ("function", "typing.Callable"),
        ("dict", "typing.Dict[str, typing.Any]"),
        ("dictionary", "typing.Dict[str, typing.Any]"),
        ("set", "typing.Set[typing.Any]"),
        ("sequence", "typing.Sequence[typing.Any]"),
        ("list", "typing.List[typing.Any]"),
        ("array", "typing.Tuple[typing.Any, ...]"),
        ("tuple", "typing.Tuple[typing.Any, ...]"),
    ])
});

/// Python builtins that never need an import.
const BUILTINS: &[&str] = &[
    "str", "int", "float", "bool", "bytes", "complex", "object", "type", "None", "list",
    "dict", "set", "tuple", "frozenset",
];

/// Generic wrapper for a `<container> of <element>` phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    List,
    Set,
    Sequence,
    Iterable,
    Tuple,
    Pair,
    PropCollection,
}

impl Container {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "list" | "lists" | "vector" | "vectors" => Some(Container::List),
            "set" | "sets" => Some(Container::Set),
            "sequence" | "sequences" => Some(Container::Sequence),
            "iterable" | "iterables" => Some(Container::Iterable),
            "tuple" | "tuples" | "array" | "arrays" => Some(Container::Tuple),
            "pair" | "pairs" => Some(Container::Pair),
            "bpy_prop_collection" => Some(Container::PropCollection),
            _ => None,
        }
    }

    fn wrap(self, element: &str) -> String {
        match self {
            Container::List => format!("typing.List[{element}]"),
            Container::Set => format!("typing.Set[{element}]"),
            Container::Sequence => format!("typing.Sequence[{element}]"),
            Container::Iterable => format!("typing.Iterable[{element}]"),
            Container::Tuple => format!("typing.Tuple[{element}, ...]"),
            Container::Pair => format!("typing.Tuple[{element}, {element}]"),
            Container::PropCollection => format!(
                "typing.Union[typing.Sequence[{element}], typing.Mapping[str, {element}], {PROP_COLLECTION}]"
            ),
        }
    }
}

/// Look up a primitive word, case-insensitive and tolerant of plurals.
///
/// "Floats" → `float`, "dictionaries" → `typing.Dict[str, typing.Any]`.
pub fn primitive(word: &str) -> Option<&'static str> {
    let word = word.to_ascii_lowercase();
    if let Some(found) = PRIMITIVES.get(word.as_str()).copied() {
        return Some(found);
    }
    let singular = if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = word.strip_suffix("es").filter(|s| s.ends_with('s')) {
        stem.to_string()
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        return None;
    };
    PRIMITIVES.get(singular.as_str()).copied()
}

/// Whether a name is a Python builtin that needs no import.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

// -- Public API ---------------------------------------------------------------

type Rule = fn(&str) -> Option<String>;

/// Rules in precedence order. Union phrasing is tried last.
const RULES: &[Rule] = &[
    parse_array_of,
    parse_multi_array_of,
    parse_qualified_list,
    parse_bracket_list,
    parse_container_of,
    parse_dictionary,
    parse_reference,
    parse_simple,
    parse_special_cases,
];

/// Parse a free-text type description into a typing expression.
///
/// Returns `None` for empty or unrecognized text. Never panics on malformed
/// input.
pub fn parse_type(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_single(text).or_else(|| parse_union(text))
}

fn parse_single(text: &str) -> Option<String> {
    RULES.iter().find_map(|rule| rule(text))
}

// -- Rules --------------------------------------------------------------------

/// Digits too long for `usize` still mean "too many to unroll".
fn item_count(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}

fn fixed_tuple(element: &str, count: usize) -> String {
    if count == 0 || count > MAX_UNROLLED {
        return format!("typing.Tuple[{element}, ...]");
    }
    format!("typing.Tuple[{}]", vec![element; count].join(", "))
}

/// `float array of 3 items, default (0.0, 0.0, 0.0)`
fn parse_array_of(text: &str) -> Option<String> {
    let caps = RE_ARRAY_OF.captures(text)?;
    let element = primitive(&caps["data"])?;
    Some(fixed_tuple(element, item_count(&caps["count"])))
}

/// `float multi-dimensional array of 4 * 4 items`
fn parse_multi_array_of(text: &str) -> Option<String> {
    let caps = RE_MULTI_ARRAY_OF.captures(text)?;
    let element = primitive(&caps["data"])?;
    let rows = item_count(&caps["rows"]);
    let cols = item_count(&caps["cols"]);
    Some(fixed_tuple(&fixed_tuple(element, cols), rows))
}

/// `list (3d vector of 3 float)`
fn parse_qualified_list(text: &str) -> Option<String> {
    let caps = RE_QUALIFIED_LIST.captures(text)?;
    let element = primitive(&caps["data"])?;
    Some(format!("typing.List[{element}]"))
}

/// `list[str]`, `list [ :class:`Object` ]`
fn parse_bracket_list(text: &str) -> Option<String> {
    let caps = RE_LIST_BRACKET.captures(text)?;
    let element = if let Some(data) = caps.name("data") {
        primitive(data.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| data.as_str().to_string())
    } else {
        reference_target(caps.name("reference")?.as_str())?
    };
    Some(format!("typing.List[{element}]"))
}

/// `list of float`, `sequence of :class:`Object`, tuple`,
/// `:class:`bpy_prop_collection` of :class:`Object``
fn parse_container_of(text: &str) -> Option<String> {
    let caps = RE_CONTAINER_OF.captures(text)?;

    let container = match (caps.name("container"), caps.name("container_ref")) {
        (Some(word), _) => Container::from_word(word.as_str())?,
        (None, Some(reference)) => {
            let target = reference_target(reference.as_str())?;
            let last = target.rsplit('.').next().unwrap_or(target.as_str());
            Container::from_word(last)?
        }
        (None, None) => return None,
    };

    let mut element = match (caps.name("data"), caps.name("reference")) {
        (Some(data), _) => primitive(data.as_str())?.to_string(),
        (None, Some(reference)) => reference_target(reference.as_str())?,
        (None, None) => return None,
    };

    // An unknown qualifier leaves the element untouched.
    if let Some(qualifier) = caps.name("qualifier") {
        let qualifier = qualifier
            .as_str()
            .trim_start_matches(|c: char| c == ',' || c == '.' || c == '\'' || c.is_whitespace())
            .to_ascii_lowercase();
        if qualifier.starts_with("tuple") {
            element = format!("typing.Tuple[{element}, ...]");
        } else if qualifier.starts_with("list") {
            element = format!("typing.List[{element}]");
        } else if qualifier.starts_with("sequence") {
            element = format!("typing.Sequence[{element}]");
        }
    }

    Some(container.wrap(&element))
}

/// `dict[str, int]`, `dictionary (str, :class:`Object`)`
fn parse_dictionary(text: &str) -> Option<String> {
    let caps = RE_DICTIONARY.captures(text)?;

    fn guess(value: &str) -> String {
        let value = value.trim();
        if value.is_empty() {
            return ANY.to_string();
        }
        if let Some(found) = primitive(value) {
            return found.to_string();
        }
        parse_reference(value).unwrap_or_else(|| ANY.to_string())
    }

    let key = guess(&caps["key"]);
    let value = guess(&caps["value"]);
    Some(format!("typing.Dict[{key}, {value}]"))
}

/// `:class:`bpy.types.Object``, `:class:`~Object <bpy.types.Object>`, (readonly)`
fn parse_reference(text: &str) -> Option<String> {
    let caps = RE_REFERENCE.captures(text)?;
    if yields_to_union(caps.name("rest").map(|m| m.as_str()), text) {
        return None;
    }
    let target = caps
        .name("target")
        .map(|m| m.as_str())
        .unwrap_or_else(|| caps["name"].trim());
    if target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

/// `int in [0, 10000], default 0`, `Boolean`, `unsigned int`
fn parse_simple(text: &str) -> Option<String> {
    let caps = RE_SIMPLE.captures(text)?;
    if yields_to_union(caps.name("rest").map(|m| m.as_str()), text) {
        return None;
    }
    primitive(&caps["type"]).map(str::to_string)
}

/// `enum in [...]`, `enum set in {...}`, `function ...`, `4D vector`
fn parse_special_cases(text: &str) -> Option<String> {
    // `float or Vector` keeps both alternatives.
    if RE_OR.is_match(text) && parse_union(text).is_some() {
        return None;
    }

    let lower = text.to_ascii_lowercase();

    if lower.contains("enum set in") {
        return Some("typing.Set[str]".to_string());
    }
    if lower.contains("enum in") {
        return Some("str".to_string());
    }
    if lower.starts_with("function") {
        return Some("typing.Callable".to_string());
    }

    let mentions_vector = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .any(|w| w == "vector");
    if mentions_vector {
        return Some(VECTOR.to_string());
    }

    None
}

/// `int or float`, `:class:`Object` or :class:`Mesh``
fn parse_union(text: &str) -> Option<String> {
    let segments: Vec<&str> = RE_OR.split(text).collect();
    if segments.len() < 2 {
        return None;
    }

    let mut members: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        let segment = segment.trim().trim_end_matches(',').trim();
        if segment.is_empty() {
            return None;
        }
        let member = parse_single(segment)?;
        if !members.contains(&member) {
            members.push(member);
        }
    }

    if members.len() == 1 {
        return members.pop();
    }
    Some(format!("typing.Union[{}]", members.join(", ")))
}

// -- Helpers ------------------------------------------------------------------

/// Resolve the inside of a `:class:` role (`Name`, `~a.b.Name`, `Title <a.b.Name>`).
fn reference_target(inner: &str) -> Option<String> {
    parse_reference(&format!(":class:`{inner}`"))
}

/// A head match followed by ` or <type>` defers to the union rule.
fn yields_to_union(rest: Option<&str>, text: &str) -> bool {
    let Some(rest) = rest else {
        return false;
    };
    let rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    rest.starts_with("or ") && parse_union(text).is_some()
}
