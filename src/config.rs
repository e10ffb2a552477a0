//!
//! sqlchat configuration
//! ---------------------
//! Per-session settings for statement rewriting and result shaping. Every field
//! has a default so that a partial JSON body (HTTP) or a handful of environment
//! variables are enough to build a config; CLI flags are applied on top.

use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_TABLE_NAME: &str = "tbl";
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// How an alias assignment (`name = expr`) materializes `name`.
///
/// One strategy is selected per session. Switching strategy on a session that
/// already created objects is not supported; open a fresh session instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMode {
    #[default]
    Table,
    View,
}

impl CreationMode {
    pub fn keyword(self) -> &'static str {
        match self {
            CreationMode::Table => "TABLE",
            CreationMode::View => "VIEW",
        }
    }
}

/// Row cap applied to query statements. `<= 0` means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowLimit(i64);

impl RowLimit {
    pub const NONE: RowLimit = RowLimit(0);

    pub fn new(n: i64) -> Self { RowLimit(n) }

    /// The configured limit when it is positive.
    pub fn get(self) -> Option<u64> {
        if self.0 > 0 { Some(self.0 as u64) } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name the uploaded source is registered under.
    pub default_table_name: String,
    /// Default row limit for `submit` calls that do not pass their own.
    pub row_limit: RowLimit,
    pub creation_mode: CreationMode,
    /// Inject `FROM <latest>` into FROM-less SELECT probes.
    pub auto_from_table: bool,
    pub preview_rows: usize,
    /// Register every successful non-creating query result under this name.
    pub capture_result_as: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_table_name: DEFAULT_TABLE_NAME.to_string(),
            row_limit: RowLimit::NONE,
            creation_mode: CreationMode::Table,
            auto_from_table: true,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            capture_result_as: None,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `SQLCHAT_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(name) = parse_string_env("SQLCHAT_DEFAULT_TABLE") { cfg.default_table_name = name; }
        if let Some(n) = parse_i64_env("SQLCHAT_ROW_LIMIT") { cfg.row_limit = RowLimit::new(n); }
        if let Some(views) = parse_bool_env("SQLCHAT_USE_VIEWS") {
            cfg.creation_mode = if views { CreationMode::View } else { CreationMode::Table };
        }
        if let Some(v) = parse_bool_env("SQLCHAT_AUTO_FROM") { cfg.auto_from_table = v; }
        if let Some(n) = parse_i64_env("SQLCHAT_PREVIEW_ROWS") { cfg.preview_rows = n.max(0) as usize; }
        if let Some(name) = parse_string_env("SQLCHAT_CAPTURE_RESULT_AS") { cfg.capture_result_as = Some(name); }
        cfg
    }
}

/// HTTP front end settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { bind: "127.0.0.1".to_string(), http_port: 7979 } }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(b) = parse_string_env("SQLCHAT_BIND") { cfg.bind = b; }
        if let Some(p) = parse_port_env("SQLCHAT_HTTP_PORT") { cfg.http_port = p; }
        cfg
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_bool_env(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_bool(&v))
}

pub fn parse_port_env(name: &str) -> Option<u16> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u16>().ok())
}

fn parse_i64_env(name: &str) -> Option<i64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<i64>().ok())
}

fn parse_string_env(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_limit_non_positive_is_none() {
        assert_eq!(RowLimit::new(0).get(), None);
        assert_eq!(RowLimit::new(-3).get(), None);
        assert_eq!(RowLimit::new(5).get(), Some(5));
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        for s in ["1", "true", "YES", " on "] { assert_eq!(parse_bool(s), Some(true)); }
        for s in ["0", "False", "no", "off"] { assert_eq!(parse_bool(s), Some(false)); }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SessionConfig = serde_json::from_str(r#"{"creation_mode":"view","row_limit":25}"#).unwrap();
        assert_eq!(cfg.creation_mode, CreationMode::View);
        assert_eq!(cfg.row_limit.get(), Some(25));
        assert_eq!(cfg.default_table_name, "tbl");
        assert!(cfg.auto_from_table);
        assert_eq!(cfg.capture_result_as, None);
    }
}
