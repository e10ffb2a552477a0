//! Unified application error model and mapping helpers.
//! This module provides the error enum returned by the session service and its
//! frontends (REPL, HTTP), along with helper mappers to stable codes and HTTP statuses.

use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Input that no classification rule accepts (e.g. blank input).
    #[error("cannot classify input `{input}`: {reason}")]
    ClassificationAmbiguity { input: String, reason: String },
    /// An alias assignment (`name = expr`) whose target or body is unusable.
    #[error("invalid alias target: {reason} (input: `{input}`)")]
    InvalidAliasTarget { input: String, reason: String },
    /// A FROM-less input was submitted while no table is loaded.
    #[error("no table is loaded yet; upload data or create a table before `{input}`")]
    MissingLatestTable { input: String },
    /// Engine failure, surfaced verbatim.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unsupported source format `{extension}` (expected csv, tsv, parquet, json, ndjson)")]
    UnsupportedSourceFormat { extension: String },
    /// Every decoding attempt for a text source failed.
    #[error("failed to decode `{name}` (tried {attempts}): {message}")]
    SourceDecode { name: String, attempts: String, message: String },
    #[error("session not found: {id}")]
    SessionNotFound { id: String },
    #[error("io error: {message}")]
    Io { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::ClassificationAmbiguity { .. } => "classification_ambiguity",
            AppError::InvalidAliasTarget { .. } => "invalid_alias_target",
            AppError::MissingLatestTable { .. } => "missing_latest_table",
            AppError::Catalog(e) => e.code_str(),
            AppError::UnsupportedSourceFormat { .. } => "unsupported_source_format",
            AppError::SourceDecode { .. } => "source_decode",
            AppError::SessionNotFound { .. } => "session_not_found",
            AppError::Io { .. } => "io",
            AppError::Internal { .. } => "internal",
        }
    }

    pub fn io<S: Into<String>>(msg: S) -> Self { AppError::Io { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::ClassificationAmbiguity { .. }
            | AppError::InvalidAliasTarget { .. }
            | AppError::MissingLatestTable { .. } => 400,
            AppError::Catalog(CatalogError::KindMismatch { .. })
            | AppError::Catalog(CatalogError::DropKindMismatch { .. })
            | AppError::Catalog(CatalogError::AlreadyExists { .. }) => 409,
            AppError::Catalog(_) => 422,
            AppError::UnsupportedSourceFormat { .. } => 415,
            AppError::SourceDecode { .. } => 422,
            AppError::SessionNotFound { .. } => 404,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
