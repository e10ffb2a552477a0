//!
//! Execution wrapper
//! -----------------
//! Sends a rewritten statement to the catalog, times it, shapes EXPLAIN output and
//! updates the session from the confirmed outcome. Session state is never touched
//! when the catalog reports a failure.

use std::time::{Duration, Instant};

use polars::prelude::DataFrame;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError, ResultSet};
use crate::error::{AppError, AppResult};
use crate::loader::{self, SourceFormat, TextEncoding};
use crate::session::Session;
use crate::statement::Statement;

/// Wall-clock time of one execution. EXPLAIN reports `NotApplicable`, not zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    Measured(Duration),
    NotApplicable,
}

impl Elapsed {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Elapsed::Measured(d) => Some(d.as_secs_f64()),
            Elapsed::NotApplicable => None,
        }
    }
}

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Elapsed::Measured(d) => write!(f, "{:.2} seconds", d.as_secs_f64()),
            Elapsed::NotApplicable => write!(f, "n/a"),
        }
    }
}

impl Serialize for Elapsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.seconds() {
            Some(s) => serializer.serialize_some(&s),
            None => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryOutput {
    Table(ResultSet),
    /// Key/value pairs of an EXPLAIN.
    Explain(Vec<(String, String)>),
}

impl QueryOutput {
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutput::Table(rs) => rs.row_count(),
            QueryOutput::Explain(kv) => kv.len(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            QueryOutput::Table(rs) => rs.column_count(),
            QueryOutput::Explain(_) => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub output: Result<QueryOutput, CatalogError>,
    pub elapsed: Elapsed,
}

/// Run `statement` and apply its confirmed effect to `session`.
pub fn execute<C: Catalog + ?Sized>(catalog: &mut C, session: &mut Session, statement: &Statement) -> Execution {
    debug!(target: "sqlchat::exec", "executing: {}", statement.rewritten);
    let started = Instant::now();
    let result = catalog.execute(&statement.rewritten);
    let took = started.elapsed();

    let explain = statement.is_explain();
    let elapsed = if explain { Elapsed::NotApplicable } else { Elapsed::Measured(took) };
    let output = match result {
        Ok(rs) => {
            if let Some(name) = statement.created_table_name() {
                session.record_table_outcome(name, true);
            }
            if let Some(name) = statement.dropped_table_name() {
                session.record_table_dropped(name);
            }
            info!(target: "sqlchat::exec", "ok: {} row(s) in {}", rs.row_count(), elapsed);
            Ok(if explain { QueryOutput::Explain(explain_pairs(&rs)) } else { QueryOutput::Table(rs) })
        }
        Err(e) => {
            warn!(target: "sqlchat::exec", "failed after {:?}: {}", took, e);
            Err(e)
        }
    };
    Execution { output, elapsed }
}

fn explain_pairs(rs: &ResultSet) -> Vec<(String, String)> {
    let (cols, rows) = rs.to_tabular();
    rows.into_iter()
        .map(|row| {
            let mut cells = row.into_iter().map(|c| c.unwrap_or_default());
            match cols.len() {
                0 => (String::new(), String::new()),
                1 => (cols[0].clone(), cells.next().unwrap_or_default()),
                _ => (cells.next().unwrap_or_default(), cells.next().unwrap_or_default()),
            }
        })
        .collect()
}

/// A source that made it into the catalog.
#[derive(Debug, Clone)]
pub struct Registered {
    pub frame: DataFrame,
    pub encoding: TextEncoding,
}

/// Decode `bytes` and register the frame under `name`, walking the encoding fallbacks.
///
/// Only decoding failures move on to the next encoding; a catalog refusal is returned
/// as-is.
pub fn register_source<C: Catalog + ?Sized>(
    catalog: &mut C,
    name: &str,
    file_name: &str,
    format: SourceFormat,
    bytes: &[u8],
) -> AppResult<Registered> {
    let attempts = TextEncoding::attempts(format);
    let mut last_message = String::new();
    for (i, encoding) in attempts.iter().copied().enumerate() {
        match loader::decode(format, bytes, encoding) {
            Ok(handle) => {
                let frame = handle.frame().clone();
                catalog.register(name, handle)?;
                info!(target: "sqlchat::exec", "registered '{}' from '{}' ({} rows, {})", name, file_name, frame.height(), encoding.label());
                return Ok(Registered { frame, encoding });
            }
            Err(e) => {
                let message = match e {
                    AppError::SourceDecode { message, .. } => message,
                    other => other.to_string(),
                };
                if i + 1 < attempts.len() {
                    warn!(target: "sqlchat::loader", "decoding '{}' as {} failed ({}); retrying as {}", file_name, encoding.label(), message, attempts[i + 1].label());
                }
                last_message = message;
            }
        }
    }
    Err(AppError::SourceDecode {
        name: file_name.to_string(),
        attempts: attempts.iter().map(|e| e.label()).collect::<Vec<_>>().join(", "),
        message: last_message,
    })
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod exec_tests;
