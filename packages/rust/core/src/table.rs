//! Source table loading.
//!
//! Spreadsheet reading happens upstream; this module accepts what those
//! exports look like on disk:
//! - `.csv`: plain grid, no highlight information
//! - `.json`: `{"rows": [[cell, ...], ...]}` where a cell is `null`, a number,
//!   a string, or `{"value": ..., "highlighted": true}`
//! - `.js`: a data file that already declares `const <variable> = [...]`

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use dataembed_literal::scan;
use dataembed_shared::{CellValue, EmbedError, RawCell, Result, SourceTable};

/// Format of a dataset source, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Json,
    /// An existing literal, embedded verbatim.
    Literal,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some("js" | "mjs") => Ok(Self::Literal),
            _ => Err(EmbedError::table(format!(
                "unsupported source type: {} (expected .csv, .json or .js)",
                path.display()
            ))),
        }
    }
}

/// Read a `.csv` or `.json` source table.
pub fn load_table(path: &Path) -> Result<SourceTable> {
    let content = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
    let table = match SourceKind::from_path(path)? {
        SourceKind::Csv => parse_csv(&content)?,
        SourceKind::Json => parse_json(&content)?,
        SourceKind::Literal => {
            return Err(EmbedError::table(format!(
                "{} is a data file, not a table",
                path.display()
            )));
        }
    };
    debug!(path = %path.display(), rows = table.rows.len(), width = table.width(), "table loaded");
    Ok(table)
}

/// Read the literal assigned to `variable` from a `.js` data file.
pub fn load_literal(path: &Path, variable: &str) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
    let span = scan(&content, variable).map_err(|miss| miss.into_error(variable))?;
    debug!(path = %path.display(), variable, len = span.text.len(), "literal extracted");
    Ok(span.text)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Parse CSV text into a table. Rows may be ragged; empty fields become null.
pub fn parse_csv(content: &str) -> Result<SourceTable> {
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| EmbedError::table(format!("CSV row {}: {e}", index + 1)))?;
        let row = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    RawCell::empty()
                } else {
                    RawCell::plain(CellValue::text(field))
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(SourceTable::new(rows))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Wrapped { rows: Vec<Vec<JsonCell>> },
    Bare(Vec<Vec<JsonCell>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCell {
    Detailed {
        value: serde_json::Value,
        #[serde(default)]
        highlighted: bool,
    },
    Scalar(serde_json::Value),
}

/// Parse a JSON table export.
pub fn parse_json(content: &str) -> Result<SourceTable> {
    let file: TableFile = serde_json::from_str(content)
        .map_err(|e| EmbedError::table(format!("invalid JSON table: {e}")))?;
    let raw_rows = match file {
        TableFile::Wrapped { rows } | TableFile::Bare(rows) => rows,
    };

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (r, raw_row) in raw_rows.into_iter().enumerate() {
        let mut row = Vec::with_capacity(raw_row.len());
        for (c, cell) in raw_row.into_iter().enumerate() {
            let (value, highlighted) = match cell {
                JsonCell::Detailed { value, highlighted } => (value, highlighted),
                JsonCell::Scalar(value) => (value, false),
            };
            let value = json_value(value).ok_or_else(|| {
                EmbedError::table(format!("row {r}, column {c}: unsupported cell value"))
            })?;
            row.push(RawCell { value, highlighted });
        }
        rows.push(row);
    }

    Ok(SourceTable::new(rows))
}

fn json_value(value: serde_json::Value) -> Option<CellValue> {
    match value {
        serde_json::Value::Null => Some(CellValue::Null),
        serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number),
        serde_json::Value::String(s) => Some(CellValue::Text(s)),
        serde_json::Value::Bool(b) => Some(CellValue::Text(b.to_string())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}
