//! In-process catalog over the Polars SQL context.
//!
//! Objects live in a name -> (kind, frame) map owned by the catalog. Tables hold a
//! materialized frame; views hold the lazy plan of their defining query. A fresh
//! `SQLContext` is assembled from the map for each statement, so the map stays the
//! single source of truth for what exists.

use std::collections::BTreeMap;

use polars::prelude::*;
use polars::sql::SQLContext;
use tracing::debug;

use super::dialect::{parse_command, CatalogCommand};
use super::{cell_text, Catalog, CatalogError, ObjectKind, ResultSet, TabularHandle};
use crate::statement::leading_word;

#[derive(Clone)]
struct Object {
    kind: ObjectKind,
    frame: LazyFrame,
}

#[derive(Default)]
pub struct PolarsCatalog {
    objects: BTreeMap<String, Object>,
}

impl PolarsCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn kind_of(&self, name: &str) -> Option<ObjectKind> {
        self.objects.get(name).map(|o| o.kind)
    }

    fn context(&self) -> SQLContext {
        let mut ctx = SQLContext::new();
        for (name, obj) in &self.objects {
            ctx.register(name, obj.frame.clone());
        }
        ctx
    }

    fn plan(&self, query: &str) -> Result<LazyFrame, CatalogError> {
        let word = leading_word(query).to_ascii_uppercase();
        if !matches!(word.as_str(), "SELECT" | "WITH" | "VALUES" | "") {
            return Err(CatalogError::Unsupported(format!("statement is not supported by this catalog: {}", query)));
        }
        Ok(self.context().execute(query)?)
    }

    // A bare object name resolves to that object; anything else is planned as a query.
    fn resolve(&self, target: &str) -> Result<LazyFrame, CatalogError> {
        if is_identifier(target) {
            return self
                .objects
                .get(target)
                .map(|o| o.frame.clone())
                .ok_or_else(|| CatalogError::NotFound { name: target.to_string() });
        }
        self.plan(target)
    }

    fn create(&mut self, kind: ObjectKind, name: String, or_replace: bool, if_not_exists: bool, body: &str) -> Result<ResultSet, CatalogError> {
        if let Some(existing) = self.kind_of(&name) {
            if if_not_exists {
                return Ok(ResultSet::empty());
            }
            if !or_replace {
                return Err(CatalogError::AlreadyExists { name, kind: existing });
            }
            if existing != kind {
                return Err(CatalogError::KindMismatch { name, existing, requested: kind });
            }
        }
        let plan = self.plan(body)?;
        let frame = match kind {
            ObjectKind::Table => plan.collect()?.lazy(),
            ObjectKind::View => plan,
        };
        debug!(target: "sqlchat::catalog", "create {} '{}'", kind, name);
        self.objects.insert(name, Object { kind, frame });
        Ok(ResultSet::empty())
    }

    fn drop_object(&mut self, kind: ObjectKind, name: String, if_exists: bool) -> Result<ResultSet, CatalogError> {
        match self.kind_of(&name) {
            None if if_exists => Ok(ResultSet::empty()),
            None => Err(CatalogError::NotFound { name }),
            Some(existing) if existing != kind => Err(CatalogError::DropKindMismatch { name, existing, requested: kind }),
            Some(_) => {
                debug!(target: "sqlchat::catalog", "drop {} '{}'", kind, name);
                self.objects.remove(&name);
                Ok(ResultSet::empty())
            }
        }
    }

    fn show_tables(&self, all: bool) -> Result<ResultSet, CatalogError> {
        let names: Vec<String> = self.objects.keys().cloned().collect();
        let mut columns = vec![Column::new("name".into(), names)];
        if all {
            let kinds: Vec<String> = self.objects.values().map(|o| o.kind.to_string()).collect();
            columns.push(Column::new("type".into(), kinds));
        }
        Ok(ResultSet::new(DataFrame::new(columns)?))
    }

    fn describe(&self, target: &str) -> Result<ResultSet, CatalogError> {
        let mut lf = self.resolve(target)?;
        let schema = lf.collect_schema()?;
        let names: Vec<String> = schema.iter().map(|(n, _)| n.to_string()).collect();
        let types: Vec<String> = schema.iter().map(|(_, t)| t.to_string()).collect();
        let df = DataFrame::new(vec![
            Column::new("column_name".into(), names),
            Column::new("column_type".into(), types),
        ])?;
        Ok(ResultSet::new(df))
    }

    fn summarize(&self, target: &str) -> Result<ResultSet, CatalogError> {
        let df = self.resolve(target)?.collect()?;
        let height = df.height();
        let mut names = Vec::with_capacity(df.width());
        let mut types = Vec::with_capacity(df.width());
        let mut mins: Vec<Option<String>> = Vec::with_capacity(df.width());
        let mut maxs: Vec<Option<String>> = Vec::with_capacity(df.width());
        let mut uniques: Vec<u64> = Vec::with_capacity(df.width());
        let mut null_pct: Vec<f64> = Vec::with_capacity(df.width());
        for col in df.get_columns() {
            let s = col.as_materialized_series();
            names.push(s.name().to_string());
            types.push(s.dtype().to_string());
            mins.push(s.min_reduce().ok().and_then(|v| cell_text(v.value().clone())));
            maxs.push(s.max_reduce().ok().and_then(|v| cell_text(v.value().clone())));
            uniques.push(s.n_unique().map(|n| n as u64).unwrap_or(0));
            null_pct.push(if height == 0 { 0.0 } else { 100.0 * s.null_count() as f64 / height as f64 });
        }
        let counts = vec![height as u64; names.len()];
        let out = DataFrame::new(vec![
            Column::new("column_name".into(), names),
            Column::new("column_type".into(), types),
            Column::new("min".into(), mins),
            Column::new("max".into(), maxs),
            Column::new("approx_unique".into(), uniques),
            Column::new("null_percentage".into(), null_pct),
            Column::new("count".into(), counts),
        ])?;
        Ok(ResultSet::new(out))
    }

    fn explain(&self, body: &str) -> Result<ResultSet, CatalogError> {
        let lf = self.plan(body)?;
        let logical = lf.describe_plan()?;
        let optimized = lf.describe_optimized_plan()?;
        let df = DataFrame::new(vec![
            Column::new("explain_key".into(), ["logical_plan", "optimized_plan"]),
            Column::new("explain_value".into(), [logical, optimized]),
        ])?;
        Ok(ResultSet::new(df))
    }
}

impl Catalog for PolarsCatalog {
    fn register(&mut self, name: &str, source: TabularHandle) -> Result<(), CatalogError> {
        if let Some(ObjectKind::Table) = self.kind_of(name) {
            return Err(CatalogError::KindMismatch {
                name: name.to_string(),
                existing: ObjectKind::Table,
                requested: ObjectKind::View,
            });
        }
        debug!(target: "sqlchat::catalog", "register view '{}' ({} rows)", name, source.frame().height());
        self.objects.insert(name.to_string(), Object { kind: ObjectKind::View, frame: source.into_frame().lazy() });
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<ResultSet, CatalogError> {
        match parse_command(statement) {
            CatalogCommand::Create { kind, name, or_replace, if_not_exists, body } => {
                self.create(kind, name, or_replace, if_not_exists, &body)
            }
            CatalogCommand::Drop { kind, name, if_exists } => self.drop_object(kind, name, if_exists),
            CatalogCommand::ShowTables { all } => self.show_tables(all),
            CatalogCommand::Describe { target } => self.describe(&target),
            CatalogCommand::Summarize { target } => self.summarize(&target),
            CatalogCommand::Explain { body } => self.explain(&body),
            CatalogCommand::Query(sql) => Ok(ResultSet::new(self.plan(&sql)?.collect()?)),
        }
    }

    fn clear(&mut self) {
        debug!(target: "sqlchat::catalog", "clear: {} object(s)", self.objects.len());
        self.objects.clear();
    }

    fn objects(&self) -> Vec<(String, ObjectKind)> {
        self.objects.iter().map(|(n, o)| (n.clone(), o.kind)).collect()
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "polars_catalog_tests.rs"]
mod polars_catalog_tests;
