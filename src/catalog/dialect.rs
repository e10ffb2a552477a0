//! Statement shapes the Polars catalog handles itself, and the FROM-first shim.
//!
//! Polars' SQL front end expects `SELECT ... FROM ...`; the rewriter produces
//! `FROM t SELECT ...`. Everything that is not a catalog-level command is turned
//! into standard order here before it reaches the engine.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ObjectKind;
use crate::statement::{find_keyword, leading_word};

static CREATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*create\s+(?P<replace>or\s+replace\s+)?(?:temp(?:orary)?\s+)?(?P<kind>table|view)\s+(?P<ine>if\s+not\s+exists\s+)?(?P<name>\w+)\s+as\s+(?P<body>.+)$")
        .expect("static regex")
});
static DROP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*drop\s+(?P<kind>table|view)\s+(?P<ie>if\s+exists\s+)?(?P<name>\w+)\s*$").expect("static regex")
});
static SHOW_TABLES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*show\s+(?P<all>all\s+)?tables\s*$").expect("static regex"));
static PREFIXED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?P<cmd>describe|desc|show|summarize|explain)\s+(?P<rest>.+)$").expect("static regex")
});

// Clause keywords that end a SELECT list.
const SELECT_LIST_TERMINATORS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "QUALIFY", "WINDOW", "ORDER", "LIMIT", "OFFSET", "UNION", "EXCEPT", "INTERSECT",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    Create { kind: ObjectKind, name: String, or_replace: bool, if_not_exists: bool, body: String },
    Drop { kind: ObjectKind, name: String, if_exists: bool },
    ShowTables { all: bool },
    /// `DESCRIBE x` / `SHOW x`: x is a name or a query.
    Describe { target: String },
    Summarize { target: String },
    Explain { body: String },
    Query(String),
}

/// Recognize the command shape of one statement. A trailing `;` is ignored.
pub fn parse_command(sql: &str) -> CatalogCommand {
    let text = strip_terminator(sql);
    if let Some(c) = CREATE_RE.captures(text) {
        return CatalogCommand::Create {
            kind: kind_of(&c["kind"]),
            name: c["name"].to_string(),
            or_replace: c.name("replace").is_some(),
            if_not_exists: c.name("ine").is_some(),
            body: normalize_from_first(c["body"].trim()),
        };
    }
    if let Some(c) = DROP_RE.captures(text) {
        return CatalogCommand::Drop { kind: kind_of(&c["kind"]), name: c["name"].to_string(), if_exists: c.name("ie").is_some() };
    }
    if let Some(c) = SHOW_TABLES_RE.captures(text) {
        return CatalogCommand::ShowTables { all: c.name("all").is_some() };
    }
    if let Some(c) = PREFIXED_RE.captures(text) {
        let rest = normalize_from_first(c["rest"].trim());
        return match c["cmd"].to_ascii_lowercase().as_str() {
            "summarize" => CatalogCommand::Summarize { target: rest },
            "explain" => CatalogCommand::Explain { body: rest },
            _ => CatalogCommand::Describe { target: rest },
        };
    }
    CatalogCommand::Query(normalize_from_first(text))
}

/// `FROM t SELECT a WHERE ...` becomes `SELECT a FROM t WHERE ...`; a lone `FROM t ...`
/// becomes `SELECT * FROM t ...`. Anything else is returned unchanged.
pub fn normalize_from_first(sql: &str) -> String {
    let text = strip_outer_parens(strip_terminator(sql));
    if text.starts_with('(') || !leading_word(text).eq_ignore_ascii_case("FROM") {
        return text.to_string();
    }
    let Some(sel) = find_keyword(text, "SELECT") else {
        return format!("SELECT * {}", text);
    };
    let from_part = text[..sel].trim();
    let select_part = &text[sel..];
    let split = clause_start(select_part).unwrap_or(select_part.len());
    let (list, tail) = select_part.split_at(split);
    let tail = tail.trim();
    if tail.is_empty() {
        format!("{} {}", list.trim(), from_part)
    } else {
        format!("{} {} {}", list.trim(), from_part, tail)
    }
}

pub fn strip_terminator(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// `((q))` becomes `q` when the outer parentheses enclose the whole text.
fn strip_outer_parens(mut text: &str) -> &str {
    while text.starts_with('(') && matching_paren(text) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

// Offset of the parenthesis closing the one at offset 0, skipping quoted text.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        match quote {
            Some(q) => {
                if b == q { quote = None; }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 { return Some(i); }
                }
                _ => {}
            },
        }
    }
    None
}

fn kind_of(word: &str) -> ObjectKind {
    if word.eq_ignore_ascii_case("view") { ObjectKind::View } else { ObjectKind::Table }
}

// Offset of the first clause keyword after the select list, at parenthesis depth 0.
fn clause_start(select_part: &str) -> Option<usize> {
    let bytes = select_part.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = "SELECT".len();
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q { quote = None; }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if depth == 0 && (i == 0 || !is_word(bytes[i - 1])) => {
                    let rest = &select_part[i..];
                    let word = leading_word(rest);
                    if rest.starts_with(word)
                        && SELECT_LIST_TERMINATORS.iter().any(|k| k.eq_ignore_ascii_case(word))
                    {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
