//!
//! Statement model and keyword scanning
//! ------------------------------------
//! A `Statement` is built fresh for every submitted input: the raw text, its
//! classification, and the rewritten text actually sent to the catalog. The table a
//! statement creates (or drops) is always derived from the rewritten text so that an
//! alias assignment and a hand-written `CREATE TABLE ... AS` converge on the same
//! bookkeeping.

pub mod classify;
pub mod limit;
pub mod rewrite;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub use classify::{classify, Classification, MetaKind, Probe};
pub use limit::{inject_row_limit, LimitOutcome};
pub use rewrite::{rewrite, RewriteOptions};

static CREATED_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*create\s+(?:or\s+replace\s+)?(?:temp(?:orary)?\s+)?(?:view|table)\s+(?:if\s+not\s+exists\s+)?(?P<table_name>\w+)\s+as\b")
        .expect("static regex")
});

static DROPPED_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*drop\s+(?:view|table)\s+(?:if\s+exists\s+)?(?P<table_name>\w+)")
        .expect("static regex")
});

/// Non-fatal notes produced while rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewriteWarning {
    /// The input already carries a LIMIT, so the configured row limit was not applied.
    ExplicitLimitTakesPrecedence { configured: u64 },
}

impl std::fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewriteWarning::ExplicitLimitTakesPrecedence { configured } => {
                write!(f, "User has overridden the row limit; the configured limit of {} rows was not applied.", configured)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub raw: String,
    pub rewritten: String,
    pub classification: Classification,
    pub warnings: Vec<RewriteWarning>,
}

impl Statement {
    /// Name the statement registers as a new or replaced table/view, if any.
    pub fn created_table_name(&self) -> Option<&str> {
        created_table_name(&self.rewritten)
    }

    pub fn dropped_table_name(&self) -> Option<&str> {
        DROPPED_TABLE_RE
            .captures(&self.rewritten)
            .and_then(|c| c.name("table_name"))
            .map(|m| m.as_str())
    }

    pub fn is_explain(&self) -> bool {
        matches!(self.classification, Classification::MetaQuery { meta: MetaKind::Explain })
    }
}

pub fn created_table_name(sql: &str) -> Option<&str> {
    CREATED_TABLE_RE
        .captures(sql)
        .and_then(|c| c.name("table_name"))
        .map(|m| m.as_str())
}

/// Byte offset of the first whole-word, case-insensitive occurrence of `kw`
/// outside quoted text.
pub(crate) fn find_keyword(text: &str, kw: &str) -> Option<usize> {
    let hay = text.as_bytes();
    let needle = kw.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() { return None; }
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < hay.len() {
        let b = hay[i];
        if let Some(q) = quote {
            if b == q { quote = None; }
            i += 1;
            continue;
        }
        if b == b'\'' || b == b'"' {
            quote = Some(b);
            i += 1;
            continue;
        }
        if i + needle.len() <= hay.len()
            && hay[i..i + needle.len()].eq_ignore_ascii_case(needle)
            && (i == 0 || !is_word_byte(hay[i - 1]))
            && hay.get(i + needle.len()).map(|&n| !is_word_byte(n)).unwrap_or(true)
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

pub(crate) fn contains_keyword(text: &str, kw: &str) -> bool {
    find_keyword(text, kw).is_some()
}

/// First word of `text`, skipping leading whitespace and opening parentheses.
pub(crate) fn leading_word(text: &str) -> &str {
    let t = text.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let end = t.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(t.len());
    &t[..end]
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_search_respects_word_boundaries() {
        assert_eq!(find_keyword("SELECT a FROM t", "from"), Some(9));
        assert_eq!(find_keyword("select from_date", "FROM"), None);
        assert_eq!(find_keyword("SELECT 'from' AS x", "FROM"), None);
        assert_eq!(find_keyword("SELECT \"from\"", "FROM"), None);
        assert!(contains_keyword("x\nselect\n1", "SELECT"));
    }

    #[test]
    fn created_table_pattern_variants() {
        assert_eq!(created_table_name("CREATE OR REPLACE TABLE big AS SELECT 1"), Some("big"));
        assert_eq!(created_table_name("create view v as from t select *"), Some("v"));
        assert_eq!(created_table_name("CREATE TEMP TABLE IF NOT EXISTS t2 AS SELECT 1"), Some("t2"));
        assert_eq!(created_table_name("CREATE TABLE t (a INT)"), None);
        assert_eq!(created_table_name("SELECT 1"), None);
    }

    #[test]
    fn created_table_only_at_statement_start() {
        assert_eq!(created_table_name("  create table t as select 1"), Some("t"));
        assert_eq!(created_table_name("FROM tbl SELECT 'create table ghost as 1' AS note"), None);
        assert_eq!(created_table_name("SELECT 1 AS x -- create view v as"), None);
    }

    #[test]
    fn leading_word_skips_parens() {
        assert_eq!(leading_word("  (SELECT 1)"), "SELECT");
        assert_eq!(leading_word("with x as (select 1) select * from x"), "with");
        assert_eq!(leading_word(""), "");
    }
}
