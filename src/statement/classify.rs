use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::{contains_keyword, find_keyword};
use crate::error::{AppError, AppResult};
use crate::session::Session;

static ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(\w+)\s*=(.*)$").expect("static regex"));

/// How a FROM-less probe is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// Contains SELECT but no FROM: `FROM <latest>` goes in front of the SELECT.
    InjectFrom,
    /// No SELECT at all: evaluated as `SELECT <input>`.
    Scalar,
}

/// Statement-introducing keywords recognized anywhere in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKind {
    Create,
    Drop,
    Alter,
    Show,
    Describe,
    Summarize,
    Explain,
    Pragma,
    Mutation,
    Other,
}

const META_KEYWORDS: &[(&str, MetaKind)] = &[
    ("CREATE", MetaKind::Create),
    ("DROP", MetaKind::Drop),
    ("ALTER", MetaKind::Alter),
    ("SHOW", MetaKind::Show),
    ("DESCRIBE", MetaKind::Describe),
    ("SUMMARIZE", MetaKind::Summarize),
    ("EXPLAIN", MetaKind::Explain),
    ("PRAGMA", MetaKind::Pragma),
    ("INSERT", MetaKind::Mutation),
    ("UPDATE", MetaKind::Mutation),
    ("DELETE", MetaKind::Mutation),
    ("TRUNCATE", MetaKind::Mutation),
    ("ATTACH", MetaKind::Other),
    ("DETACH", MetaKind::Other),
    ("COPY", MetaKind::Other),
    ("EXPORT", MetaKind::Other),
    ("INSTALL", MetaKind::Other),
    ("CHECKPOINT", MetaKind::Other),
];

// Words that cannot be an alias target: `select = 1` is not an assignment.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "CASE", "WHEN", "THEN", "ELSE", "END",
    "GROUP", "ORDER", "HAVING", "LIMIT", "WITH", "AS", "ON", "JOIN",
];

// Bare words that are valid scalar probes on their own.
const LITERAL_WORDS: &[&str] = &[
    "TRUE", "FALSE", "NULL", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
];

/// Which rewrite rule applies to an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    BareTableReference { table: String },
    AliasAssignment { target: String, expression: String },
    ProbeExpression { probe: Probe },
    FullStatement,
    MetaQuery { meta: MetaKind },
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::BareTableReference { .. } => "bare_table_reference",
            Classification::AliasAssignment { .. } => "alias_assignment",
            Classification::ProbeExpression { .. } => "probe_expression",
            Classification::FullStatement => "full_statement",
            Classification::MetaQuery { .. } => "meta_query",
        }
    }
}

/// Classify a raw input line against the session, first matching rule wins:
/// trailing `;`, alias assignment, meta keyword, known table, SELECT probe, scalar probe.
pub fn classify(raw: &str, session: &Session, auto_from_table: bool) -> AppResult<Classification> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::ClassificationAmbiguity { input: raw.to_string(), reason: "input is empty".into() });
    }
    let cls = if text.ends_with(';') {
        Classification::FullStatement
    } else if let Some((target, expression)) = match_alias(text)? {
        Classification::AliasAssignment { target, expression }
    } else {
        classify_body(text, session, auto_from_table)?
    };
    debug!(target: "sqlchat::statement", "classify: '{}' -> {}", text, cls.label());
    Ok(cls)
}

/// Rules 3-6, shared with the defining expression of an alias assignment.
pub(crate) fn classify_body(text: &str, session: &Session, auto_from_table: bool) -> AppResult<Classification> {
    if let Some(meta) = meta_keyword(text) {
        return Ok(Classification::MetaQuery { meta });
    }
    if session.is_known_table(text) {
        return Ok(Classification::BareTableReference { table: text.to_string() });
    }
    if contains_keyword(text, "SELECT") {
        if contains_keyword(text, "FROM") || !auto_from_table {
            return Ok(Classification::FullStatement);
        }
        return Ok(Classification::ProbeExpression { probe: Probe::InjectFrom });
    }
    if is_bare_identifier(text) && session.latest_table().is_none() {
        // A lone name with nothing loaded can only mean a table that does not exist yet.
        return Err(AppError::MissingLatestTable { input: text.to_string() });
    }
    Ok(Classification::ProbeExpression { probe: Probe::Scalar })
}

fn match_alias(text: &str) -> AppResult<Option<(String, String)>> {
    if text.starts_with('=') && !text.starts_with("==") {
        return Err(AppError::InvalidAliasTarget {
            input: text.to_string(),
            reason: "missing table name before `=`".into(),
        });
    }
    let Some(caps) = ALIAS_RE.captures(text) else { return Ok(None) };
    let ident = &caps[1];
    let rest = &caps[2];
    if rest.starts_with('=') {
        return Ok(None);
    }
    if ident.chars().all(|c| c.is_ascii_digit()) || RESERVED.iter().any(|r| r.eq_ignore_ascii_case(ident)) {
        return Ok(None);
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(AppError::InvalidAliasTarget {
            input: text.to_string(),
            reason: format!("table name `{}` must not start with a digit", ident),
        });
    }
    let expression = rest.trim();
    if expression.is_empty() {
        return Err(AppError::InvalidAliasTarget {
            input: text.to_string(),
            reason: format!("missing defining expression for `{}`", ident),
        });
    }
    Ok(Some((ident.to_string(), expression.to_string())))
}

fn meta_keyword(text: &str) -> Option<MetaKind> {
    META_KEYWORDS
        .iter()
        .filter_map(|(kw, kind)| find_keyword(text, kw).map(|pos| (pos, *kind)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, kind)| kind)
}

fn is_bare_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    first_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LITERAL_WORDS.iter().any(|w| w.eq_ignore_ascii_case(text))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod classify_tests;
