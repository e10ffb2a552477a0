use super::RewriteWarning;
use crate::config::RowLimit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOutcome {
    pub statement: String,
    pub warning: Option<RewriteWarning>,
}

/// Append `LIMIT n;` to a query statement when a positive limit is configured.
///
/// Any occurrence of the text `LIMIT` (case-insensitive, even inside an identifier such as
/// `speed_limit`) counts as an explicit limit: the statement is left alone and a warning is
/// returned instead.
pub fn inject_row_limit(statement: &str, limit: RowLimit) -> LimitOutcome {
    let Some(n) = limit.get() else {
        return LimitOutcome { statement: statement.to_string(), warning: None };
    };
    if statement.to_uppercase().contains("LIMIT") {
        return LimitOutcome {
            statement: statement.to_string(),
            warning: Some(RewriteWarning::ExplicitLimitTakesPrecedence { configured: n }),
        };
    }
    let body = statement.trim_end().trim_end_matches(';').trim_end();
    LimitOutcome { statement: format!("{} LIMIT {};", body, n), warning: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_before_semicolon() {
        let out = inject_row_limit("SELECT *;", RowLimit::new(5));
        assert_eq!(out.statement, "SELECT * LIMIT 5;");
        assert!(out.warning.is_none());
        let out = inject_row_limit("FROM tbl SELECT *", RowLimit::new(10));
        assert_eq!(out.statement, "FROM tbl SELECT * LIMIT 10;");
    }

    #[test]
    fn non_positive_limit_is_noop() {
        for n in [0, -1] {
            let out = inject_row_limit("SELECT 1", RowLimit::new(n));
            assert_eq!(out.statement, "SELECT 1");
            assert!(out.warning.is_none());
        }
    }

    #[test]
    fn explicit_limit_wins_with_warning() {
        let out = inject_row_limit("select * from t limit 3", RowLimit::new(5));
        assert_eq!(out.statement, "select * from t limit 3");
        assert_eq!(out.warning, Some(RewriteWarning::ExplicitLimitTakesPrecedence { configured: 5 }));
    }

    #[test]
    fn identifier_containing_limit_is_treated_as_explicit_limit() {
        // Known false positive: the column name suppresses the configured limit.
        let out = inject_row_limit("SELECT speed_limit FROM roads;", RowLimit::new(5));
        assert_eq!(out.statement, "SELECT speed_limit FROM roads;");
        assert!(out.warning.is_some());
    }
}
