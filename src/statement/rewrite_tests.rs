use super::*;

fn with_tables(names: &[&str]) -> Session {
    let mut s = Session::new();
    for n in names {
        s.record_table_outcome(n, true);
    }
    s
}

#[test]
fn full_statement_passes_through() {
    let st = rewrite("SELECT 1;", &Session::new(), &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "SELECT 1;");
    assert_eq!(st.created_table_name(), None);
}

#[test]
fn select_probe_gets_latest_table() {
    let s = with_tables(&["tbl"]);
    let st = rewrite("SELECT *", &s, &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "FROM tbl SELECT *");
    let st = rewrite("  select count(*) ", &s, &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "FROM tbl select count(*)");
}

#[test]
fn alias_becomes_create_or_replace() {
    let s = with_tables(&["tbl"]);
    let st = rewrite("big = SELECT * FROM tbl WHERE x > 10", &s, &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "CREATE OR REPLACE TABLE big AS SELECT * FROM tbl WHERE x > 10");
    assert_eq!(st.created_table_name(), Some("big"));

    let views = RewriteOptions { creation_mode: CreationMode::View, ..RewriteOptions::default() };
    let st = rewrite("v = SELECT 1 FROM tbl", &s, &views).unwrap();
    assert_eq!(st.rewritten, "CREATE OR REPLACE VIEW v AS SELECT 1 FROM tbl");
    assert_eq!(st.created_table_name(), Some("v"));
}

#[test]
fn alias_body_is_completed() {
    let s = with_tables(&["tbl", "big"]);
    let opts = RewriteOptions::default();
    assert_eq!(rewrite("c = tbl", &s, &opts).unwrap().rewritten, "CREATE OR REPLACE TABLE c AS FROM tbl SELECT *");
    assert_eq!(
        rewrite("c = SELECT a WHERE a > 1", &s, &opts).unwrap().rewritten,
        "CREATE OR REPLACE TABLE c AS FROM big SELECT a WHERE a > 1"
    );
    assert_eq!(rewrite("c = 42", &s, &opts).unwrap().rewritten, "CREATE OR REPLACE TABLE c AS SELECT 42");
}

#[test]
fn bare_table_projects_everything() {
    let s = with_tables(&["tbl", "big"]);
    let st = rewrite("tbl", &s, &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "FROM tbl SELECT *");
    assert_eq!(st.created_table_name(), None);
}

#[test]
fn scalar_probe_is_wrapped() {
    let st = rewrite("1 + 1", &Session::new(), &RewriteOptions::default()).unwrap();
    assert_eq!(st.rewritten, "SELECT 1 + 1");
}

#[test]
fn row_limit_only_for_queries() {
    let s = with_tables(&["tbl"]);
    let opts = RewriteOptions::default().with_row_limit(RowLimit::new(5));
    assert_eq!(rewrite("SELECT *;", &s, &opts).unwrap().rewritten, "SELECT * LIMIT 5;");
    assert_eq!(rewrite("tbl", &s, &opts).unwrap().rewritten, "FROM tbl SELECT * LIMIT 5;");
    assert_eq!(
        rewrite("big = SELECT * FROM tbl", &s, &opts).unwrap().rewritten,
        "CREATE OR REPLACE TABLE big AS SELECT * FROM tbl"
    );
    assert_eq!(rewrite("SHOW TABLES", &s, &opts).unwrap().rewritten, "SHOW TABLES");
    assert_eq!(rewrite("DROP TABLE tbl;", &s, &opts).unwrap().rewritten, "DROP TABLE tbl;");
}

#[test]
fn explicit_limit_is_kept_and_reported() {
    let s = with_tables(&["tbl"]);
    let opts = RewriteOptions::default().with_row_limit(RowLimit::new(5));
    let st = rewrite("SELECT * LIMIT 2", &s, &opts).unwrap();
    assert_eq!(st.rewritten, "FROM tbl SELECT * LIMIT 2");
    assert_eq!(st.warnings.len(), 1);
}

#[test]
fn missing_latest_table_fails_before_catalog() {
    let err = rewrite("SELECT *", &Session::new(), &RewriteOptions::default()).unwrap_err();
    assert!(matches!(err, AppError::MissingLatestTable { .. }));
}

#[test]
fn rewrite_does_not_touch_session() {
    let s = with_tables(&["tbl"]);
    let before = s.snapshot();
    let _ = rewrite("big = SELECT * FROM tbl", &s, &RewriteOptions::default()).unwrap();
    assert_eq!(s.snapshot(), before);
}
