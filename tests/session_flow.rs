// End-to-end flows through the public API against the Polars catalog, with
// sources read from disk the way the REPL reads them.

use std::fs;
use std::path::Path;

use sqlchat::catalog::{Catalog, ObjectKind};
use sqlchat::config::{CreationMode, RowLimit, SessionConfig};
use sqlchat::exec::QueryOutput;
use sqlchat::loader::TextEncoding;
use sqlchat::statement::Classification;
use sqlchat::{new_session, AppError, ChatSession};

fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> Vec<u8> {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    fs::read(&path).unwrap()
}

fn loaded_from_disk(config: SessionConfig) -> (tempfile::TempDir, ChatSession) {
    let dir = tempfile::tempdir().unwrap();
    let bytes = write_source(dir.path(), "data.csv", b"x,name\n5,a\n12,b\n20,c\n3,d\n");
    let mut cs = new_session(config);
    let report = cs.load_source("data.csv", &bytes).unwrap();
    assert_eq!(report.rows, 4);
    (dir, cs)
}

fn rows_of(cs: &mut ChatSession, raw: &str) -> usize {
    let sub = cs.submit(raw, None);
    match sub.outcome {
        Ok(out) => out.row_count(),
        Err(e) => panic!("`{}` failed: {}", raw, e),
    }
}

#[test]
fn escape_hatch_runs_verbatim_without_tables() {
    let mut cs = new_session(SessionConfig::default());
    let sub = cs.submit("SELECT 1;", None);
    assert_eq!(sub.rewritten.as_deref(), Some("SELECT 1;"));
    assert!(matches!(sub.classification, Some(Classification::FullStatement)));
    assert_eq!(sub.outcome.unwrap().row_count(), 1);
    assert!(cs.current_tables().active_tables.is_empty());
}

#[test]
fn walkthrough_with_on_disk_csv() {
    let (_dir, mut cs) = loaded_from_disk(SessionConfig::default());

    let sub = cs.submit("SELECT *", None);
    assert_eq!(sub.rewritten.as_deref(), Some("FROM tbl SELECT *"));
    assert_eq!(sub.outcome.unwrap().row_count(), 4);

    let sub = cs.submit("big = SELECT * FROM tbl WHERE x > 10", None);
    assert_eq!(sub.rewritten.as_deref(), Some("CREATE OR REPLACE TABLE big AS SELECT * FROM tbl WHERE x > 10"));
    sub.outcome.unwrap();
    let tables = cs.current_tables();
    assert_eq!(tables.latest_table.as_deref(), Some("big"));
    assert_eq!(tables.active_tables, vec!["big".to_string(), "tbl".to_string()]);

    // FROM-less probes now target the new latest table.
    assert_eq!(rows_of(&mut cs, "SELECT name"), 2);
    // Bare names never change the session.
    assert_eq!(rows_of(&mut cs, "tbl"), 4);
    assert_eq!(cs.current_tables(), tables);
    assert_eq!(rows_of(&mut cs, "1 + 1"), 1);
}

#[test]
fn row_limits_apply_to_queries_only() {
    let (_dir, mut cs) = loaded_from_disk(SessionConfig { row_limit: RowLimit::new(2), ..SessionConfig::default() });
    let sub = cs.submit("tbl", None);
    assert_eq!(sub.rewritten.as_deref(), Some("FROM tbl SELECT * LIMIT 2;"));
    assert_eq!(sub.outcome.unwrap().row_count(), 2);

    let sub = cs.submit("SELECT *;", Some(RowLimit::new(5)));
    assert_eq!(sub.rewritten.as_deref(), Some("SELECT * LIMIT 5;"));

    let sub = cs.submit("SELECT * FROM tbl LIMIT 3;", None);
    assert_eq!(sub.warnings.len(), 1);
    assert_eq!(sub.outcome.unwrap().row_count(), 3);

    let sub = cs.submit("small = SELECT * FROM tbl WHERE x < 10", None);
    assert!(!sub.rewritten.unwrap().contains("LIMIT"));
    assert!(sub.outcome.is_ok());
}

#[test]
fn repeated_create_or_replace_keeps_single_entry() {
    let (_dir, mut cs) = loaded_from_disk(SessionConfig::default());
    for _ in 0..2 {
        cs.submit("CREATE OR REPLACE TABLE t AS SELECT * FROM tbl WHERE x > 4;", None).outcome.unwrap();
    }
    let tables = cs.current_tables();
    assert_eq!(tables.active_tables, vec!["t".to_string(), "tbl".to_string()]);
    assert_eq!(tables.latest_table.as_deref(), Some("t"));
}

#[test]
fn failed_statements_leave_tables_alone() {
    let (_dir, mut cs) = loaded_from_disk(SessionConfig::default());
    let before = cs.current_tables();
    let sub = cs.submit("oops = SELECT missing_column FROM tbl", None);
    assert!(matches!(sub.outcome, Err(AppError::Catalog(_))));
    assert!(sub.elapsed.is_some());
    assert_eq!(cs.current_tables(), before);
    assert_eq!(cs.catalog().kind_of("oops"), None);
}

#[test]
fn view_mode_and_drop_bookkeeping() {
    let config = SessionConfig { creation_mode: CreationMode::View, ..SessionConfig::default() };
    let (_dir, mut cs) = loaded_from_disk(config);
    cs.submit("v = SELECT name FROM tbl WHERE x > 4", None).outcome.unwrap();
    assert_eq!(cs.catalog().kind_of("v"), Some(ObjectKind::View));
    assert_eq!(rows_of(&mut cs, "v"), 3);

    cs.submit("DROP VIEW v;", None).outcome.unwrap();
    let tables = cs.current_tables();
    assert_eq!(tables.latest_table.as_deref(), Some("tbl"));
    assert_eq!(tables.active_tables, vec!["tbl".to_string()]);
}

#[test]
fn meta_queries_describe_the_catalog() {
    let (_dir, mut cs) = loaded_from_disk(SessionConfig::default());
    assert_eq!(rows_of(&mut cs, "DESCRIBE tbl"), 2);
    assert_eq!(rows_of(&mut cs, "SUMMARIZE tbl"), 2);
    assert_eq!(rows_of(&mut cs, "SHOW TABLES"), 1);

    let sub = cs.submit("EXPLAIN SELECT x FROM tbl WHERE x > 4", None);
    assert!(sub.summary_line().unwrap().starts_with("Time usage: n/a;"));
    match sub.outcome.unwrap() {
        QueryOutput::Explain(pairs) => assert_eq!(pairs[0].0, "logical_plan"),
        other => panic!("expected explain output, got {:?}", other),
    }
}

#[test]
fn latin1_file_falls_back_and_reload_resets() {
    let dir = tempfile::tempdir().unwrap();
    let latin = write_source(dir.path(), "cities.csv", b"city,pop\nK\xf6ln,1084\nZ\xfcrich,421\n");
    let mut cs = new_session(SessionConfig::default());
    let report = cs.load_source("cities.csv", &latin).unwrap();
    assert_eq!(report.encoding, TextEncoding::Latin1);
    assert_eq!(report.preview_rows[0][0].as_deref(), Some("Köln"));

    cs.submit("big = SELECT * FROM tbl WHERE pop > 500", None).outcome.unwrap();
    let again = cs.load_source("cities.csv", &latin).unwrap();
    assert!(again.unchanged);
    assert!(cs.current_tables().active_tables.contains(&"big".to_string()));

    let tsv = write_source(dir.path(), "other.tsv", b"a\tb\n1\t2\n");
    cs.load_source("other.tsv", &tsv).unwrap();
    assert_eq!(cs.current_tables().active_tables, vec!["tbl".to_string()]);
    assert!(matches!(cs.submit("big", None).outcome, Err(_)));

    cs.unload();
    let sub = cs.submit("SELECT *", None);
    assert!(matches!(sub.outcome, Err(AppError::MissingLatestTable { .. })));
    assert!(cs.catalog().objects().is_empty());
}

#[test]
fn load_path_reads_from_disk_and_reports_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "events.ndjson", b"{\"id\":1}\n{\"id\":2}\n");
    let mut cs = new_session(SessionConfig::default());
    let report = cs.load_path(dir.path().join("events.ndjson")).unwrap();
    assert_eq!(report.file_name, "events.ndjson");
    assert_eq!(report.rows, 2);

    let err = cs.load_path(dir.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, AppError::Io { .. }));
    assert_eq!(err.code_str(), "io");
    assert!(err.to_string().contains("missing.csv"));
    // A failed read never reaches the catalog.
    assert_eq!(cs.current_tables().latest_table.as_deref(), Some("tbl"));
}
