//! reStructuredText block reader: line-by-line, indentation driven.
//!
//! Covers the constructs API references actually use: titles, paragraphs,
//! literal blocks, block quotes, field lists, comments and explicit
//! directives with nested content. Anything else degrades to a paragraph.
//! Reading never fails.

use regex::Regex;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

static RE_EXPLICIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.\.(?:\s|$)").unwrap());

static RE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\.\s+(?P<name>[A-Za-z][\w:-]*)::(?:\s+(?P<arg>.*))?$").unwrap()
});

static RE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(?P<name>[^:`\s][^:`]*):(?:\s+(?P<body>.*))?$").unwrap()
});

const TITLE_MARKERS: &str = "=-~^\"'`*+#:.<>_";

// -- Blocks -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph { text: String, line: usize },
    Title { text: String, marker: char, line: usize },
    Literal { text: String, line: usize },
    Quote { blocks: Vec<Block>, line: usize },
    FieldList { fields: Vec<FieldItem>, line: usize },
    Directive(Directive),
    Comment { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    pub name: String,
    /// Body with whitespace collapsed to single spaces.
    pub body: String,
    pub blocks: Vec<Block>,
}

/// `.. name:: argument` with options and nested content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    /// Argument lines joined by `\n`; trailing backslashes are kept.
    pub argument: String,
    pub options: Vec<(String, String)>,
    pub content: Vec<Block>,
    /// Directive source as written.
    pub raw: String,
    pub line: usize,
}

/// Read a whole document.
pub fn read(text: &str) -> Vec<Block> {
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.replace('\t', "        ").trim_end().to_string())
        .collect();
    parse(&lines, 1)
}

// -- Reader -------------------------------------------------------------------

fn parse(lines: &[String], first_line: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let lineno = first_line + i;

        if is_blank(line) {
            i += 1;
            continue;
        }

        if indent_of(line) > 0 {
            let end = indented_end(lines, i);
            let body = dedent(&lines[i..end]);
            let literal = matches!(
                blocks.last(),
                Some(Block::Paragraph { text, .. }) if text.ends_with("::")
            );
            if literal {
                blocks.push(Block::Literal {
                    text: body.join("\n"),
                    line: lineno,
                });
            } else {
                blocks.push(Block::Quote {
                    blocks: parse(&body, lineno),
                    line: lineno,
                });
            }
            i = end;
            continue;
        }

        if RE_EXPLICIT.is_match(line) {
            let end = indented_end(lines, i + 1).max(i + 1);
            match RE_DIRECTIVE.captures(line) {
                Some(caps) => {
                    let name = caps["name"].to_string();
                    let argument = caps.name("arg").map_or("", |m| m.as_str()).trim();
                    blocks.push(Block::Directive(directive(
                        name,
                        argument,
                        &lines[i..end],
                        lineno,
                    )));
                }
                None => blocks.push(Block::Comment { line: lineno }),
            }
            i = end;
            continue;
        }

        if RE_FIELD.is_match(line) {
            let (fields, end) = field_list(lines, i, first_line);
            blocks.push(Block::FieldList {
                fields,
                line: lineno,
            });
            i = end;
            continue;
        }

        if let Some((text, marker, end)) = title(lines, i) {
            blocks.push(Block::Title {
                text,
                marker,
                line: lineno,
            });
            i = end;
            continue;
        }

        let mut end = i;
        while end < lines.len() && !is_blank(&lines[end]) && indent_of(&lines[end]) == 0 {
            end += 1;
        }
        blocks.push(Block::Paragraph {
            text: lines[i..end].join("\n"),
            line: lineno,
        });
        i = end;
    }

    blocks
}

fn directive(name: String, argument: &str, block: &[String], line: usize) -> Directive {
    let rest = dedent(&block[1..]);

    let mut arguments: Vec<String> = Vec::new();
    if !argument.is_empty() {
        arguments.push(argument.to_string());
    }

    // The argument runs until a blank line or the first option.
    let mut k = 0;
    let continued = |args: &[String]| args.last().is_some_and(|a| a.ends_with('\\'));
    while k < rest.len()
        && !is_blank(&rest[k])
        && (continued(&arguments) || !RE_FIELD.is_match(&rest[k]))
    {
        arguments.push(rest[k].trim().to_string());
        k += 1;
    }

    let mut options = Vec::new();
    while k < rest.len() && !is_blank(&rest[k]) {
        if let Some(caps) = RE_FIELD.captures(&rest[k]) {
            let value = caps.name("body").map_or("", |m| m.as_str()).trim();
            options.push((caps["name"].trim().to_string(), value.to_string()));
        }
        k += 1;
    }

    while k < rest.len() && is_blank(&rest[k]) {
        k += 1;
    }
    let content = parse(&dedent(&rest[k..]), line + 1 + k);

    Directive {
        name,
        argument: arguments.join("\n"),
        options,
        content,
        raw: block.join("\n"),
        line,
    }
}

fn field_list(lines: &[String], start: usize, first_line: usize) -> (Vec<FieldItem>, usize) {
    let mut fields = Vec::new();
    let mut i = start;

    while let Some(caps) = lines.get(i).and_then(|l| RE_FIELD.captures(l)) {
        let name = caps["name"].trim().to_string();
        let first = caps.name("body").map_or("", |m| m.as_str()).to_string();

        let end = indented_end(lines, i + 1).max(i + 1);
        let mut body_lines = vec![first];
        body_lines.extend(dedent(&lines[i + 1..end]));

        let body = body_lines
            .iter()
            .flat_map(|l| l.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        let blocks = parse(&body_lines, first_line + i);
        fields.push(FieldItem { name, body, blocks });

        // Blank lines between fields keep the list going.
        let mut next = end;
        while next < lines.len() && is_blank(&lines[next]) {
            next += 1;
        }
        i = end;
        if lines.get(next).is_some_and(|l| RE_FIELD.is_match(l)) {
            i = next;
        } else {
            break;
        }
    }

    (fields, i)
}

/// `(text, marker, next index)` for an underlined or overlined title.
fn title(lines: &[String], i: usize) -> Option<(String, char, usize)> {
    let line = &lines[i];

    if let Some(over) = underline_char(line) {
        let text = lines.get(i + 1)?;
        let under = lines.get(i + 2).and_then(|l| underline_char(l))?;
        if over == under && !is_blank(text) {
            return Some((text.trim().to_string(), under, i + 3));
        }
        return None;
    }

    let under = lines.get(i + 1)?;
    let marker = underline_char(under)?;
    let width = under.trim().chars().count();
    if width >= 3 || width >= line.trim().chars().count() {
        return Some((line.trim().to_string(), marker, i + 2));
    }
    None
}

fn underline_char(line: &str) -> Option<char> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if line.len() < 2 || !TITLE_MARKERS.contains(first) || !line.chars().all(|c| c == first) {
        return None;
    }
    Some(first)
}

// -- Line helpers -------------------------------------------------------------

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// End of the indented (or blank) run starting at `start`, with trailing
/// blank lines excluded. Returns `start` when the run is empty.
fn indented_end(lines: &[String], start: usize) -> usize {
    let mut last = start;
    let mut i = start;
    while i < lines.len() && (is_blank(&lines[i]) || indent_of(&lines[i]) > 0) {
        if !is_blank(&lines[i]) {
            last = i + 1;
        }
        i += 1;
    }
    last
}

fn dedent(lines: &[String]) -> Vec<String> {
    let width = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if is_blank(l) { String::new() } else { l[width..].to_string() })
        .collect()
}
