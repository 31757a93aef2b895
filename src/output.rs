//! File adapters for generated rows.
//!
//! Both writers take any `Serialize` row type; column names and order come
//! from the row struct's serde attributes. The readers are used by the
//! `summarize` binary and by tests to load a run back from disk.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("row does not serialize to a record of named fields")]
    NotARecord,
}

/// Output encoding selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Ndjson,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(Format::Csv),
            "ndjson" => Some(Format::Ndjson),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Ndjson => "ndjson",
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Quote a string field, doubling any embedded quotes.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Render one field by its serialized type: strings (dates included) are
/// quoted whatever they contain, numbers and booleans are bare, `None` is empty.
fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quoted(s),
        other => quoted(&other.to_string()),
    }
}

/// Write `rows` as CSV with a header row.
///
/// Quoting follows each field's type rather than its text, so a zip code or
/// tooth number stays a quoted string even though it looks numeric. Rows are
/// serialized through `serde_json::Value` (with `preserve_order`) to keep the
/// struct's column order.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new().quote_style(QuoteStyle::Never).from_path(path)?;
    for (i, row) in rows.iter().enumerate() {
        let Value::Object(fields) = serde_json::to_value(row)? else {
            return Err(OutputError::NotARecord);
        };
        if i == 0 {
            writer.write_record(fields.keys().map(|k| quoted(k)))?;
        }
        writer.write_record(fields.values().map(csv_field))?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// Write `rows` as newline-delimited JSON, one object per line.
pub fn write_ndjson<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote ndjson");
    Ok(())
}

/// Dispatch on `format`.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T], format: Format) -> Result<(), OutputError> {
    match format {
        Format::Csv => write_csv(path, rows),
        Format::Ndjson => write_ndjson(path, rows),
    }
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

pub fn read_ndjson<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

/// Read rows back, choosing the decoder from the file extension.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ndjson") | Some("jsonl") => read_ndjson(path),
        _ => read_csv(path),
    }
}
