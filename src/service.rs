//!
//! Session service
//! ---------------
//! Caller-facing entry points shared by the REPL and the HTTP server. A
//! `ChatSession` owns one catalog namespace, its `Session` bookkeeping and a
//! transcript; every call goes through `&mut self`, which makes each session a
//! single writer. `SessionRegistry` hosts many of them, each behind its own mutex.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{dataframe_to_tabular, Catalog, PolarsCatalog};
use crate::config::{RowLimit, SessionConfig};
use crate::error::{AppError, AppResult};
use crate::exec::{self, Elapsed, QueryOutput};
use crate::loader::{SourceFormat, TextEncoding};
use crate::session::{DatasetIdentity, Session, TablesSnapshot};
use crate::statement::{rewrite, Classification, RewriteOptions, RewriteWarning};

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

/// Summary of a loaded source.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub file_name: String,
    pub fingerprint: String,
    pub format: SourceFormat,
    pub encoding: TextEncoding,
    pub rows: usize,
    pub cols: usize,
    pub schema: Vec<ColumnInfo>,
    pub preview_columns: Vec<String>,
    pub preview_rows: Vec<Vec<Option<String>>>,
    pub estimated_bytes: usize,
    /// True when the same source was already loaded and the session was kept.
    pub unchanged: bool,
}

/// Everything a caller needs to render one submitted input.
#[derive(Debug, Clone)]
pub struct Submission {
    pub raw: String,
    pub rewritten: Option<String>,
    pub classification: Option<Classification>,
    pub warnings: Vec<RewriteWarning>,
    /// `None` when the input never reached the catalog.
    pub elapsed: Option<Elapsed>,
    pub outcome: Result<QueryOutput, AppError>,
}

impl Submission {
    /// "Time usage: X seconds; Total rows R; Total columns C."
    pub fn summary_line(&self) -> Option<String> {
        let out = self.outcome.as_ref().ok()?;
        let time = self.elapsed.unwrap_or(Elapsed::NotApplicable);
        Some(format!("Time usage: {}; Total rows {}; Total columns {}.", time, out.row_count(), out.column_count()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub raw: String,
    pub rewritten: Option<String>,
    pub ok: bool,
    pub error: Option<String>,
    pub rows: Option<usize>,
    pub elapsed_seconds: Option<f64>,
}

pub struct ChatSession<C: Catalog = PolarsCatalog> {
    config: SessionConfig,
    session: Session,
    catalog: C,
    last_load: Option<LoadReport>,
    transcript: Vec<TranscriptEntry>,
}

/// A session backed by the in-process Polars catalog.
pub fn new_session(config: SessionConfig) -> ChatSession<PolarsCatalog> {
    ChatSession::with_catalog(PolarsCatalog::new(), config)
}

impl<C: Catalog> ChatSession<C> {
    pub fn with_catalog(catalog: C, config: SessionConfig) -> Self {
        Self { config, session: Session::new(), catalog, last_load: None, transcript: Vec::new() }
    }

    pub fn config(&self) -> &SessionConfig { &self.config }

    pub fn session(&self) -> &Session { &self.session }

    pub fn catalog(&self) -> &C { &self.catalog }

    pub fn set_row_limit(&mut self, limit: RowLimit) { self.config.row_limit = limit; }

    pub fn current_tables(&self) -> TablesSnapshot { self.session.snapshot() }

    pub fn transcript(&self) -> &[TranscriptEntry] { &self.transcript }

    /// Load `bytes` as the session's dataset under the default table name.
    ///
    /// Re-loading the identical source keeps the session as it is. Any other load
    /// replaces every table; a source that cannot be read leaves the session empty.
    pub fn load_source(&mut self, file_name: &str, bytes: &[u8]) -> AppResult<LoadReport> {
        let format = SourceFormat::from_file_name(file_name)?;
        let identity = DatasetIdentity::of_bytes(file_name, bytes);
        if self.session.dataset_identity() == Some(&identity) {
            if let Some(report) = &self.last_load {
                debug!(target: "sqlchat::session", "load_source: '{}' unchanged", file_name);
                return Ok(LoadReport { unchanged: true, ..report.clone() });
            }
        }

        self.catalog.clear();
        self.session.reset(Some(identity.clone()));
        self.last_load = None;
        let table = self.config.default_table_name.clone();
        let registered = match exec::register_source(&mut self.catalog, &table, file_name, format, bytes) {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "sqlchat::session", "load_source: '{}' failed: {}", file_name, e);
                self.session.reset(None);
                return Err(e);
            }
        };
        self.session.record_table_outcome(&table, true);

        let frame = registered.frame;
        let schema = frame
            .schema()
            .iter()
            .map(|(n, t)| ColumnInfo { name: n.to_string(), dtype: t.to_string() })
            .collect();
        let (preview_columns, preview_rows) = dataframe_to_tabular(&frame.head(Some(self.config.preview_rows)));
        let report = LoadReport {
            table,
            file_name: file_name.to_string(),
            fingerprint: identity.fingerprint,
            format,
            encoding: registered.encoding,
            rows: frame.height(),
            cols: frame.width(),
            schema,
            preview_columns,
            preview_rows,
            estimated_bytes: frame.estimated_size(),
            unchanged: false,
        };
        info!(target: "sqlchat::session", "loaded '{}' as '{}': {} rows x {} cols", file_name, report.table, report.rows, report.cols);
        self.last_load = Some(report.clone());
        Ok(report)
    }

    /// Read a file from disk and load it under its file name.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> AppResult<LoadReport> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| AppError::io(format!("cannot read '{}': {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::io(format!("'{}' has no usable file name", path.display())))?;
        self.load_source(file_name, &bytes)
    }

    /// Remove the dataset and every table derived from it.
    pub fn unload(&mut self) {
        self.catalog.clear();
        self.session.reset(None);
        self.last_load = None;
    }

    /// Classify, rewrite and execute one input. `row_limit` overrides the session default.
    pub fn submit(&mut self, raw: &str, row_limit: Option<RowLimit>) -> Submission {
        debug!(target: "sqlchat::statement", "received: {}", raw);
        let opts = RewriteOptions::from(&self.config).with_row_limit(row_limit.unwrap_or(self.config.row_limit));
        let submission = match rewrite(raw, &self.session, &opts) {
            Err(e) => {
                info!(target: "sqlchat::statement", "rejected '{}': {}", raw.trim(), e);
                Submission {
                    raw: raw.to_string(),
                    rewritten: None,
                    classification: None,
                    warnings: Vec::new(),
                    elapsed: None,
                    outcome: Err(e),
                }
            }
            Ok(statement) => {
                let execution = exec::execute(&mut self.catalog, &mut self.session, &statement);
                if let Ok(QueryOutput::Table(rs)) = &execution.output {
                    let creates = statement.created_table_name().is_some() || statement.dropped_table_name().is_some();
                    let is_meta = matches!(statement.classification, Classification::MetaQuery { .. });
                    if let (Some(name), false, false) = (self.config.capture_result_as.clone(), creates, is_meta) {
                        match self.catalog.register(&name, rs.clone().into_handle()) {
                            Ok(()) => self.session.record_table_outcome(&name, true),
                            Err(e) => warn!(target: "sqlchat::exec", "could not keep result as '{}': {}", name, e),
                        }
                    }
                }
                Submission {
                    raw: raw.to_string(),
                    rewritten: Some(statement.rewritten),
                    classification: Some(statement.classification),
                    warnings: statement.warnings,
                    elapsed: Some(execution.elapsed),
                    outcome: execution.output.map_err(AppError::from),
                }
            }
        };
        self.transcript.push(TranscriptEntry {
            raw: submission.raw.clone(),
            rewritten: submission.rewritten.clone(),
            ok: submission.outcome.is_ok(),
            error: submission.outcome.as_ref().err().map(|e| e.to_string()),
            rows: submission.outcome.as_ref().ok().map(|o| o.row_count()),
            elapsed_seconds: submission.elapsed.and_then(|e| e.seconds()),
        });
        submission
    }
}

pub type SharedChatSession = Arc<Mutex<ChatSession<PolarsCatalog>>>;

/// Many independent sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedChatSession>>,
    default_config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(default_config: SessionConfig) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), default_config }
    }

    pub fn create(&self, config: Option<SessionConfig>) -> Uuid {
        let id = Uuid::new_v4();
        let session = new_session(config.unwrap_or_else(|| self.default_config.clone()));
        self.sessions.write().insert(id, Arc::new(Mutex::new(session)));
        info!(target: "sqlchat::session", "session {} created", id);
        id
    }

    pub fn get(&self, id: &str) -> AppResult<SharedChatSession> {
        let key = parse_id(id)?;
        self.sessions
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub fn remove(&self, id: &str) -> AppResult<()> {
        let key = parse_id(id)?;
        match self.sessions.write().remove(&key) {
            Some(_) => {
                info!(target: "sqlchat::session", "session {} removed", id);
                Ok(())
            }
            None => Err(AppError::SessionNotFound { id: id.to_string() }),
        }
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn parse_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::SessionNotFound { id: id.to_string() })
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
