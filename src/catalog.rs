//!
//! Catalog adapter
//! ---------------
//! The query engine that owns table/view existence. The session service only talks
//! to it through the `Catalog` trait: register a tabular source under a name, run a
//! statement, clear everything. `PolarsCatalog` is the in-process implementation.

pub mod dialect;
pub mod polars_catalog;

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub use polars_catalog::PolarsCatalog;

/// Kind of a catalog object. Uploaded sources register as views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Table,
    View,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Table => write!(f, "Table"),
            ObjectKind::View => write!(f, "View"),
        }
    }
}

/// Engine failures. Display is the engine text, shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Existing object {name} is of type {existing}, trying to replace with type {requested}")]
    KindMismatch { name: String, existing: ObjectKind, requested: ObjectKind },
    #[error("Existing object {name} is of type {existing}, trying to drop type {requested}")]
    DropKindMismatch { name: String, existing: ObjectKind, requested: ObjectKind },
    #[error("{kind} with name \"{name}\" already exists!")]
    AlreadyExists { name: String, kind: ObjectKind },
    #[error("Table with name {name} does not exist!")]
    NotFound { name: String },
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Bind(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    Engine(String),
}

impl CatalogError {
    pub fn code_str(&self) -> &str {
        match self {
            CatalogError::KindMismatch { .. } | CatalogError::DropKindMismatch { .. } => "kind_mismatch",
            CatalogError::AlreadyExists { .. } => "already_exists",
            CatalogError::NotFound { .. } => "not_found",
            CatalogError::Parse(_) => "parse_error",
            CatalogError::Bind(_) => "bind_error",
            CatalogError::Type(_) => "type_error",
            CatalogError::Unsupported(_) => "unsupported",
            CatalogError::Engine(_) => "engine_error",
        }
    }
}

impl From<PolarsError> for CatalogError {
    fn from(e: PolarsError) -> Self {
        let msg = e.to_string();
        match e {
            PolarsError::SQLSyntax(_) => CatalogError::Parse(msg),
            PolarsError::SQLInterface(_) if msg.to_lowercase().contains("parser") => CatalogError::Parse(msg),
            PolarsError::SQLInterface(_) | PolarsError::ColumnNotFound(_) => CatalogError::Bind(msg),
            PolarsError::SchemaMismatch(_) | PolarsError::InvalidOperation(_) => CatalogError::Type(msg),
            _ => CatalogError::Engine(msg),
        }
    }
}

/// Columnar in-memory source produced by the loader (or a captured result).
#[derive(Debug, Clone)]
pub struct TabularHandle {
    frame: DataFrame,
}

impl TabularHandle {
    pub fn new(frame: DataFrame) -> Self { Self { frame } }
    pub fn frame(&self) -> &DataFrame { &self.frame }
    pub fn into_frame(self) -> DataFrame { self.frame }
}

/// Materialized result of one statement.
#[derive(Debug, Clone)]
pub struct ResultSet {
    frame: DataFrame,
}

impl ResultSet {
    pub fn new(frame: DataFrame) -> Self { Self { frame } }

    pub fn empty() -> Self { Self { frame: DataFrame::empty() } }

    pub fn frame(&self) -> &DataFrame { &self.frame }

    pub fn row_count(&self) -> usize { self.frame.height() }

    pub fn column_count(&self) -> usize { self.frame.width() }

    pub fn column_names(&self) -> Vec<String> {
        self.frame.get_column_names().into_iter().map(|s| s.to_string()).collect()
    }

    /// Column names plus every cell rendered as text (`None` for NULL).
    pub fn to_tabular(&self) -> (Vec<String>, Vec<Vec<Option<String>>>) {
        dataframe_to_tabular(&self.frame)
    }

    pub fn into_handle(self) -> TabularHandle { TabularHandle::new(self.frame) }
}

/// The catalog contract the execution wrapper depends on.
pub trait Catalog: Send {
    /// Register `source` under `name`. Re-registering the same name is idempotent.
    fn register(&mut self, name: &str, source: TabularHandle) -> Result<(), CatalogError>;
    fn execute(&mut self, statement: &str) -> Result<ResultSet, CatalogError>;
    /// Drop every object.
    fn clear(&mut self);
    /// Registered objects, sorted by name.
    fn objects(&self) -> Vec<(String, ObjectKind)>;
}

pub fn dataframe_to_tabular(df: &DataFrame) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let cols: Vec<String> = df.get_column_names().into_iter().map(|s| s.to_string()).collect();
    let columns = df.get_columns();
    let mut data: Vec<Vec<Option<String>>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row: Vec<Option<String>> = columns
            .iter()
            .map(|c| c.get(row_idx).ok().and_then(cell_text))
            .collect();
        data.push(row);
    }
    (cols, data)
}

/// Text of one cell; `None` for NULL.
pub(crate) fn cell_text(av: AnyValue<'_>) -> Option<String> {
    match av {
        AnyValue::Null => None,
        AnyValue::Boolean(v) => Some(if v { "true".into() } else { "false".into() }),
        AnyValue::String(v) => Some(v.to_string()),
        AnyValue::StringOwned(v) => Some(v.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::Int32(v) => Some(v.to_string()),
        AnyValue::UInt32(v) => Some(v.to_string()),
        AnyValue::UInt64(v) => Some(v.to_string()),
        AnyValue::Float64(v) => Some(v.to_string()),
        AnyValue::Float32(v) => Some(v.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_renders_nulls_and_bools() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), [Some(1i64), None]),
            Column::new("b".into(), [true, false]),
            Column::new("c".into(), ["x", "y"]),
        ])
        .unwrap();
        let (cols, rows) = dataframe_to_tabular(&df);
        assert_eq!(cols, vec!["a", "b", "c"]);
        assert_eq!(rows[0], vec![Some("1".to_string()), Some("true".to_string()), Some("x".to_string())]);
        assert_eq!(rows[1][0], None);
    }

    #[test]
    fn polars_errors_map_to_catalog_variants() {
        let e: CatalogError = PolarsError::ColumnNotFound("y".into()).into();
        assert_eq!(e.code_str(), "bind_error");
        let e: CatalogError = PolarsError::SchemaMismatch("bad".into()).into();
        assert_eq!(e.code_str(), "type_error");
        let e: CatalogError = PolarsError::ComputeError("boom".into()).into();
        assert_eq!(e.code_str(), "engine_error");
    }

    #[test]
    fn kind_mismatch_text() {
        let e = CatalogError::KindMismatch { name: "tbl".into(), existing: ObjectKind::Table, requested: ObjectKind::View };
        assert_eq!(e.to_string(), "Existing object tbl is of type Table, trying to replace with type View");
    }
}
