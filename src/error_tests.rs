use super::*;
use crate::catalog::{CatalogError, ObjectKind};

#[test]
fn http_status_mapping() {
    let alias = AppError::InvalidAliasTarget { input: "= 1".into(), reason: "empty".into() };
    assert_eq!(alias.http_status(), 400);
    assert_eq!(AppError::MissingLatestTable { input: "SELECT *".into() }.http_status(), 400);
    assert_eq!(AppError::UnsupportedSourceFormat { extension: "xlsx".into() }.http_status(), 415);
    assert_eq!(AppError::SessionNotFound { id: "x".into() }.http_status(), 404);
    assert_eq!(AppError::io("disk").http_status(), 503);
    assert_eq!(AppError::internal("panic").http_status(), 500);
    assert_eq!(AppError::from(CatalogError::Parse("bad".into())).http_status(), 422);
    let clash = CatalogError::KindMismatch {
        name: "tbl".into(),
        existing: ObjectKind::Table,
        requested: ObjectKind::View,
    };
    assert_eq!(AppError::from(clash).http_status(), 409);
}

#[test]
fn catalog_errors_display_verbatim() {
    let e = AppError::from(CatalogError::Bind("column \"y\" not found".into()));
    assert_eq!(e.to_string(), "column \"y\" not found");
    assert_eq!(e.code_str(), "bind_error");
}

#[test]
fn codes_are_snake_case() {
    assert_eq!(AppError::MissingLatestTable { input: "x".into() }.code_str(), "missing_latest_table");
    assert_eq!(AppError::UnsupportedSourceFormat { extension: "xls".into() }.code_str(), "unsupported_source_format");
}
