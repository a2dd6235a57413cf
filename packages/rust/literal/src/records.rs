//! Record building and literal rendering.
//!
//! [`build_records`] turns a source table into one [`DataRecord`] per
//! category row; [`render`] turns records back into array-literal source
//! text. Rendering is a pure function of its inputs, so re-running a dataset
//! reproduces the same bytes.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, warn};

use dataembed_shared::{
    CellValue, DataRecord, EmbedError, NormalizedValue, Number, RawCell, Result, SignPolicy,
    SourceTable,
};

use crate::normalize::normalize_with;

/// Quote characters trimmed from category labels.
const LABEL_QUOTES: &[char] = &['"', '\u{201C}', '\u{201D}'];

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// Which header cells count as period keys.
#[derive(Debug, Clone, Default)]
pub enum PeriodRule {
    /// Integer-valued cells (numeric or textual), e.g. years.
    #[default]
    Integer,
    /// Cells whose text matches the pattern.
    Pattern(Regex),
}

impl PeriodRule {
    /// Build a rule from an optional pattern; `None` means integers.
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self> {
        match pattern {
            None => Ok(Self::Integer),
            Some(p) => Regex::new(p)
                .map(Self::Pattern)
                .map_err(|e| EmbedError::validation(format!("invalid period pattern '{p}': {e}"))),
        }
    }

    /// The period key for a header cell, if it is one.
    pub fn key_for(&self, cell: &RawCell) -> Option<String> {
        match self {
            Self::Integer => match &cell.value {
                CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                    Some(Number::from_f64(*n).to_literal())
                }
                CellValue::Text(s) => s.trim().parse::<i64>().ok().map(|i| i.to_string()),
                _ => None,
            },
            Self::Pattern(re) => {
                let text = cell_text(&cell.value)?;
                re.is_match(&text).then_some(text)
            }
        }
    }
}

/// `(column, key)` for every period column of the header, in header order.
///
/// Column 0 is the label column and never a period. A repeated key keeps
/// its first column.
pub fn period_columns(table: &SourceTable, rule: &PeriodRule) -> Vec<(usize, String)> {
    let Some(header) = table.header() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for (col, cell) in header.iter().enumerate().skip(1) {
        let Some(key) = rule.key_for(cell) else {
            continue;
        };
        if !seen.insert(key.clone()) {
            warn!(column = col, period = %key, "repeated period column ignored");
            continue;
        }
        columns.push((col, key));
    }
    columns
}

/// The ordered period keys of a table's header row.
pub fn periods_of(table: &SourceTable, rule: &PeriodRule) -> Vec<String> {
    period_columns(table, rule)
        .into_iter()
        .map(|(_, key)| key)
        .collect()
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Options for turning table rows into records.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Prepended to each category label.
    pub category_prefix: Option<String>,
    pub sign_policy: SignPolicy,
    pub period_rule: PeriodRule,
}

/// Records built from one table, with bookkeeping for the run summary.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub records: Vec<DataRecord>,
    pub periods: Vec<String>,
    /// Rows whose values were all null.
    pub dropped_empty: usize,
    /// Rows repeating a category already kept.
    pub dropped_duplicate: usize,
}

/// Build one record per category row of `table`.
///
/// Rows without a text label in column 0 are not category rows and are
/// skipped. All-null rows are dropped, then later repeats of a kept category.
pub fn build_records(table: &SourceTable, opts: &BuildOptions) -> BuildOutcome {
    let columns = period_columns(table, &opts.period_rule);
    let mut outcome = BuildOutcome {
        periods: columns.iter().map(|(_, key)| key.clone()).collect(),
        ..BuildOutcome::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (index, row) in table.data_rows().iter().enumerate() {
        let Some(label) = row.first().and_then(category_label) else {
            debug!(row = index + 1, "row has no category label, skipped");
            continue;
        };
        let category = match &opts.category_prefix {
            Some(prefix) => format!("{prefix}{label}"),
            None => label,
        };

        let mut record = DataRecord::new(category);
        for (col, key) in &columns {
            let value = row
                .get(*col)
                .map_or(NormalizedValue::Null, |cell| {
                    normalize_with(cell, opts.sign_policy)
                });
            record.insert(key.clone(), value);
        }

        if !record.has_observation() {
            debug!(category = %record.category, "record has no observations, dropped");
            outcome.dropped_empty += 1;
            continue;
        }
        if !seen.insert(record.category.clone()) {
            warn!(category = %record.category, "duplicate category, later row dropped");
            outcome.dropped_duplicate += 1;
            continue;
        }
        outcome.records.push(record);
    }

    outcome
}

/// The trimmed, quote-free label of a category cell. Numeric and blank cells
/// are not labels.
fn category_label(cell: &RawCell) -> Option<String> {
    let CellValue::Text(s) = &cell.value else {
        return None;
    };
    let label: String = s.chars().filter(|c| !LABEL_QUOTES.contains(c)).collect();
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn cell_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Null => None,
        CellValue::Number(n) if n.is_finite() => Some(Number::from_f64(*n).to_literal()),
        CellValue::Number(_) => None,
        CellValue::Text(s) => Some(s.trim().to_string()),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Layout of rendered literals.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Key of the category field in every object.
    pub label_key: String,
    /// Spaces per nesting level; 0 renders a single line.
    pub indent: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            label_key: "category".into(),
            indent: 2,
        }
    }
}

/// Render records as a JSON array literal.
///
/// Each object holds the label field followed by one field per entry of
/// `periods`, in order; periods missing from a record render as `null`.
pub fn render(records: &[DataRecord], periods: &[String], opts: &RenderOptions) -> String {
    if records.is_empty() {
        return "[]".to_string();
    }

    let objects: Vec<Vec<(String, String)>> = records
        .iter()
        .map(|record| {
            let mut fields = Vec::with_capacity(periods.len() + 1);
            fields.push((json_string(&opts.label_key), json_string(&record.category)));
            for period in periods {
                let value = record
                    .get(period)
                    .map_or_else(|| "null".to_string(), value_literal);
                fields.push((json_string(period), value));
            }
            fields
        })
        .collect();

    if opts.indent == 0 {
        let body: Vec<String> = objects
            .iter()
            .map(|fields| {
                let inner: Vec<String> = fields.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                format!("{{{}}}", inner.join(","))
            })
            .collect();
        return format!("[{}]", body.join(","));
    }

    let pad = " ".repeat(opts.indent);
    let field_pad = pad.repeat(2);
    let body: Vec<String> = objects
        .iter()
        .map(|fields| {
            let inner: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{field_pad}{k}: {v}"))
                .collect();
            format!("{pad}{{\n{}\n{pad}}}", inner.join(",\n"))
        })
        .collect();
    format!("[\n{}\n]", body.join(",\n"))
}

/// JSON text for a single value. Flagged numbers become `"(n)"` strings.
pub fn value_literal(value: &NormalizedValue) -> String {
    match value {
        NormalizedValue::Number(n) => n.to_literal(),
        NormalizedValue::FlaggedNumber(n) => json_string(&format!("({})", n.to_literal())),
        NormalizedValue::Null => "null".to_string(),
        NormalizedValue::Text(s) => json_string(s),
    }
}

/// JSON string literal, with `</` written as `<\/` so text can never close
/// the surrounding script element.
fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace("</", "<\\/")
}
