//! Core domain types for dataembed: cells, normalized values, records, spans.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Raw cells & source tables
// ---------------------------------------------------------------------------

/// The raw value of one source cell, as handed over by table ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Shorthand for a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// One `(row, column)` cell of a source table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub value: CellValue,
    /// Visually distinguished in the originating sheet (e.g. red font).
    pub highlighted: bool,
}

impl RawCell {
    /// An unhighlighted cell.
    pub fn plain(value: CellValue) -> Self {
        Self {
            value,
            highlighted: false,
        }
    }

    /// A highlighted cell.
    pub fn highlighted(value: CellValue) -> Self {
        Self {
            value,
            highlighted: true,
        }
    }

    /// An empty, unhighlighted cell.
    pub fn empty() -> Self {
        Self::plain(CellValue::Null)
    }
}

/// A row-major grid of raw cells. Row 0 is the header row and column 0 holds
/// the category label of each data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub rows: Vec<Vec<RawCell>>,
}

impl SourceTable {
    pub fn new(rows: Vec<Vec<RawCell>>) -> Self {
        Self { rows }
    }

    /// The header row, if the table has any rows at all.
    pub fn header(&self) -> Option<&[RawCell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Data rows (everything after the header).
    pub fn data_rows(&self) -> &[Vec<RawCell>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Widest row length; ragged rows are padded with empty cells on access.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Swap rows and columns, padding ragged rows with empty cells.
    ///
    /// Used for sheets that list periods down the first column and
    /// categories across the header.
    pub fn transpose(&self) -> Self {
        let width = self.width();
        let rows = (0..width)
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row.get(col).cloned().unwrap_or_else(RawCell::empty))
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

// ---------------------------------------------------------------------------
// Normalized values
// ---------------------------------------------------------------------------

/// A numeric observation that remembers whether it was written as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    /// Classify a raw float: whole values up to 2^53 in magnitude become integers.
    pub fn from_f64(n: f64) -> Self {
        const LIMIT: f64 = 9_007_199_254_740_992.0;
        if n.fract() == 0.0 && n.abs() <= LIMIT {
            Self::Integer(n as i64)
        } else {
            Self::Decimal(n)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Decimal(f) => f,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Integer(i) => Self::Integer(i.saturating_neg()),
            Self::Decimal(f) => Self::Decimal(-f),
        }
    }

    /// JSON number text: `100`, `12.5`, `12.0`. Non-finite decimals render `null`.
    pub fn to_literal(self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Decimal(f) => serde_json::Number::from_f64(f)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

/// Canonical classification of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Number(Number),
    /// Number that carried the highlight (or parenthesized) convention.
    FlaggedNumber(Number),
    Null,
    Text(String),
}

impl NormalizedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One category row: a label plus its observations keyed by period.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub category: String,
    /// Insertion-ordered `(period, value)` pairs; keys are unique.
    pub values: Vec<(String, NormalizedValue)>,
}

impl DataRecord {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            values: Vec::new(),
        }
    }

    /// Set the value for a period, replacing any previous value for it.
    pub fn insert(&mut self, period: impl Into<String>, value: NormalizedValue) {
        let period = period.into();
        match self.values.iter_mut().find(|(k, _)| *k == period) {
            Some(slot) => slot.1 = value,
            None => self.values.push((period, value)),
        }
    }

    pub fn get(&self, period: &str) -> Option<&NormalizedValue> {
        self.values
            .iter()
            .find(|(k, _)| k == period)
            .map(|(_, v)| v)
    }

    /// A record with no non-null value carries no observation.
    pub fn has_observation(&self) -> bool {
        self.values.iter().any(|(_, v)| !v.is_null())
    }
}

// ---------------------------------------------------------------------------
// Spans, anchors, backups
// ---------------------------------------------------------------------------

/// Exact location of a declared literal inside a text buffer.
///
/// Offsets are UTF-8 byte offsets on `char` boundaries, so
/// `&buffer[source_start..source_end] == text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSpan {
    pub variable_name: String,
    pub source_start: usize,
    pub source_end: usize,
    pub text: String,
}

/// How to find the splice point: a marker comment followed by a script block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    pub marker: String,
    pub open_tag: String,
    pub close_tag: String,
}

/// The splice point in a target document: from the script open tag that
/// follows the marker through the end of its close tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRegion {
    pub start_marker: String,
    pub script_open_tag: String,
    pub script_close_tag: String,
    pub start: usize,
    pub end: usize,
}

impl AnchorRegion {
    /// Text strictly between the open and close tags.
    pub fn content<'a>(&self, document: &'a str) -> &'a str {
        let inner_start = self.start + self.script_open_tag.len();
        let inner_end = self.end - self.script_close_tag.len();
        document.get(inner_start..inner_end).unwrap_or_default()
    }

    /// Byte offset where the content (after the open tag) begins.
    pub fn content_start(&self) -> usize {
        self.start + self.script_open_tag.len()
    }
}

/// A full pre-mutation copy of a target document.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    /// Identity of the document this backup belongs to.
    pub document: PathBuf,
    pub content: String,
    pub taken_at: DateTime<Utc>,
}
