//!
//! Tabular source loader
//! ---------------------
//! Turns uploaded bytes plus a declared file name into a columnar frame. The format
//! is chosen from the extension; text formats can be decoded with more than one
//! encoding and the caller walks `TextEncoding::attempts` until one succeeds.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::catalog::TabularHandle;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Parquet,
    Json,
    NdJson,
}

impl SourceFormat {
    /// Format by extension of `file_name` (case-insensitive).
    pub fn from_file_name(file_name: &str) -> AppResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "tsv" | "tab" => Ok(SourceFormat::Tsv),
            "parquet" | "pq" => Ok(SourceFormat::Parquet),
            "json" => Ok(SourceFormat::Json),
            "ndjson" | "jsonl" => Ok(SourceFormat::NdJson),
            _ => Err(AppError::UnsupportedSourceFormat { extension: ext }),
        }
    }

    pub fn is_text(self) -> bool {
        !matches!(self, SourceFormat::Parquet)
    }
}

/// Decoding applied to text sources before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1, transcoded to UTF-8 byte for byte.
    Latin1,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
    /// Binary formats: bytes handed to the reader untouched.
    Binary,
}

impl TextEncoding {
    /// Encodings to try, in order, for `format`.
    pub fn attempts(format: SourceFormat) -> &'static [TextEncoding] {
        if format.is_text() {
            &[TextEncoding::Utf8, TextEncoding::Latin1, TextEncoding::Utf8Lossy]
        } else {
            &[TextEncoding::Binary]
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Utf8Lossy => "utf-8 (lossy)",
            TextEncoding::Binary => "binary",
        }
    }
}

/// Parse `bytes` as `format` using one encoding.
pub fn decode(format: SourceFormat, bytes: &[u8], encoding: TextEncoding) -> AppResult<TabularHandle> {
    let data = match encoding {
        TextEncoding::Utf8 => {
            std::str::from_utf8(bytes).map_err(|e| decode_error(encoding, e.to_string()))?;
            bytes.to_vec()
        }
        TextEncoding::Latin1 => latin1_to_utf8(bytes).into_bytes(),
        TextEncoding::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned().into_bytes(),
        TextEncoding::Binary => bytes.to_vec(),
    };
    let frame = read_frame(format, data).map_err(|e| decode_error(encoding, e.to_string()))?;
    debug!(target: "sqlchat::loader", "decoded {:?} as {}: {} rows x {} cols", format, encoding.label(), frame.height(), frame.width());
    Ok(TabularHandle::new(frame))
}

fn read_frame(format: SourceFormat, data: Vec<u8>) -> PolarsResult<DataFrame> {
    let cursor = Cursor::new(data);
    match format {
        SourceFormat::Csv | SourceFormat::Tsv => {
            let sep = if format == SourceFormat::Tsv { b'\t' } else { b',' };
            CsvReadOptions::default()
                .with_has_header(true)
                .map_parse_options(|o| o.with_separator(sep))
                .into_reader_with_file_handle(cursor)
                .finish()
        }
        SourceFormat::Parquet => ParquetReader::new(cursor).finish(),
        SourceFormat::Json => JsonReader::new(cursor).with_json_format(JsonFormat::Json).finish(),
        SourceFormat::NdJson => JsonReader::new(cursor).with_json_format(JsonFormat::JsonLines).finish(),
    }
}

// The message is replaced by the caller once every attempt has failed.
fn decode_error(encoding: TextEncoding, message: String) -> AppError {
    AppError::SourceDecode { name: String::new(), attempts: encoding.label().to_string(), message }
}

/// Every byte maps to the code point of the same value.
pub fn latin1_to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
