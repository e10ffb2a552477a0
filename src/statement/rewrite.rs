use tracing::debug;

use super::classify::{classify, classify_body, Classification, Probe};
use super::limit::inject_row_limit;
use super::{find_keyword, leading_word, Statement};
use crate::config::{CreationMode, RowLimit, SessionConfig};
use crate::error::{AppError, AppResult};
use crate::session::Session;

/// Settings the rewriter reads for one submitted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    pub creation_mode: CreationMode,
    pub auto_from_table: bool,
    pub row_limit: RowLimit,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { creation_mode: CreationMode::Table, auto_from_table: true, row_limit: RowLimit::NONE }
    }
}

impl From<&SessionConfig> for RewriteOptions {
    fn from(cfg: &SessionConfig) -> Self {
        Self { creation_mode: cfg.creation_mode, auto_from_table: cfg.auto_from_table, row_limit: cfg.row_limit }
    }
}

impl RewriteOptions {
    pub fn with_row_limit(mut self, row_limit: RowLimit) -> Self {
        self.row_limit = row_limit;
        self
    }
}

/// Classify and rewrite `raw` against a read-only view of the session.
pub fn rewrite(raw: &str, session: &Session, opts: &RewriteOptions) -> AppResult<Statement> {
    let text = raw.trim();
    let classification = classify(text, session, opts.auto_from_table)?;
    let completed = match &classification {
        Classification::AliasAssignment { target, expression } => {
            let body_cls = classify_body(expression, session, opts.auto_from_table)?;
            let body = complete(expression, &body_cls, session)?;
            format!("CREATE OR REPLACE {} {} AS {}", opts.creation_mode.keyword(), target, body)
        }
        other => complete(text, other, session)?,
    };

    let mut warnings = Vec::new();
    let rewritten = if is_query(&classification, &completed) {
        let out = inject_row_limit(&completed, opts.row_limit);
        warnings.extend(out.warning);
        out.statement
    } else {
        completed
    };
    debug!(target: "sqlchat::statement", "rewrite: '{}' -> '{}'", text, rewritten);
    Ok(Statement { raw: raw.to_string(), rewritten, classification, warnings })
}

// Rules 4-6 plus pass-through; shared by top-level inputs and alias bodies.
fn complete(text: &str, cls: &Classification, session: &Session) -> AppResult<String> {
    Ok(match cls {
        Classification::BareTableReference { table } => format!("FROM {} SELECT *", table),
        Classification::ProbeExpression { probe: Probe::InjectFrom } => {
            let latest = session
                .latest_table()
                .ok_or_else(|| AppError::MissingLatestTable { input: text.to_string() })?;
            match find_keyword(text, "SELECT") {
                Some(pos) => format!("{}FROM {} {}", &text[..pos], latest, &text[pos..]),
                None => format!("FROM {} {}", latest, text),
            }
        }
        Classification::ProbeExpression { probe: Probe::Scalar } => format!("SELECT {}", text),
        Classification::FullStatement
        | Classification::MetaQuery { .. }
        | Classification::AliasAssignment { .. } => text.to_string(),
    })
}

fn is_query(cls: &Classification, rewritten: &str) -> bool {
    match cls {
        Classification::BareTableReference { .. } | Classification::ProbeExpression { .. } => true,
        Classification::FullStatement => {
            let word = leading_word(rewritten).to_ascii_uppercase();
            matches!(word.as_str(), "SELECT" | "FROM" | "WITH" | "VALUES")
        }
        Classification::AliasAssignment { .. } | Classification::MetaQuery { .. } => false,
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod rewrite_tests;
