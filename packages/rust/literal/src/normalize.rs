//! Cell value normalization.
//!
//! Every raw cell maps to exactly one [`NormalizedValue`]. Nothing here can
//! fail: input that cannot be read as a number is kept as `Text`, and empty
//! input becomes `Null`.
//!
//! Precedence:
//! 1. null, blank, or the word `null` → `Null`
//! 2. numeric cell → `Number` (`FlaggedNumber` when highlighted)
//! 3. text cell, after stripping quotes, thousands commas and apostrophes:
//!    `(n)` → `FlaggedNumber(n)`; a decimal point selects float parsing,
//!    otherwise integer parsing; anything else → `Text`

use dataembed_shared::{CellValue, NormalizedValue, Number, RawCell, SignPolicy};

/// Characters removed from text cells before numeric parsing.
const DECORATIONS: &[char] = &['"', '\u{201C}', '\u{201D}', ',', '\'', '\u{2018}', '\u{2019}'];

/// A normalized value plus whether it was written in `(n)` notation.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub value: NormalizedValue,
    /// The text was wrapped in parentheses; `value` holds the unwrapped magnitude.
    pub parenthesized: bool,
}

impl Classified {
    fn plain(value: NormalizedValue) -> Self {
        Self {
            value,
            parenthesized: false,
        }
    }
}

/// Normalize one cell, keeping parenthesized values positive and flagged.
pub fn normalize(raw: &RawCell) -> NormalizedValue {
    classify(raw).value
}

/// Normalize one cell, then apply the dataset's sign convention.
pub fn normalize_with(raw: &RawCell, policy: SignPolicy) -> NormalizedValue {
    apply_sign_policy(classify(raw), raw.highlighted, policy)
}

/// Classify a cell and report whether it used parenthesized notation.
pub fn classify(raw: &RawCell) -> Classified {
    match &raw.value {
        CellValue::Null => Classified::plain(NormalizedValue::Null),
        CellValue::Number(n) if !n.is_finite() => Classified::plain(NormalizedValue::Null),
        CellValue::Number(n) => Classified::plain(numeric(Number::from_f64(*n), raw.highlighted)),
        CellValue::Text(s) => classify_text(s, raw.highlighted),
    }
}

/// Decide the final value of a parenthesized number.
///
/// Under [`SignPolicy::Negate`] the magnitude is negated and the value only
/// stays flagged if the cell was also highlighted. Everything else passes through.
pub fn apply_sign_policy(
    classified: Classified,
    highlighted: bool,
    policy: SignPolicy,
) -> NormalizedValue {
    match (policy, classified.parenthesized, classified.value) {
        (SignPolicy::Negate, true, NormalizedValue::FlaggedNumber(n)) => {
            numeric(n.negate(), highlighted)
        }
        (_, _, value) => value,
    }
}

fn numeric(n: Number, flagged: bool) -> NormalizedValue {
    if flagged {
        NormalizedValue::FlaggedNumber(n)
    } else {
        NormalizedValue::Number(n)
    }
}

fn classify_text(text: &str, highlighted: bool) -> Classified {
    if is_null_marker(text) {
        return Classified::plain(NormalizedValue::Null);
    }

    let cleaned = strip_decorations(text);
    if is_null_marker(&cleaned) {
        return Classified::plain(NormalizedValue::Null);
    }

    if let Some(inner) = cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return match parse_number(inner.trim()) {
            Some(n) => Classified {
                value: NormalizedValue::FlaggedNumber(n),
                parenthesized: true,
            },
            None => Classified::plain(NormalizedValue::Text(cleaned)),
        };
    }

    match parse_number(&cleaned) {
        Some(n) => Classified::plain(numeric(n, highlighted)),
        None => Classified::plain(NormalizedValue::Text(cleaned)),
    }
}

fn is_null_marker(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case("null")
}

/// Remove decorative characters and surrounding whitespace.
fn strip_decorations(s: &str) -> String {
    s.chars()
        .filter(|c| !DECORATIONS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A decimal point selects float parsing; otherwise the text must be an integer.
fn parse_number(s: &str) -> Option<Number> {
    if s.contains('.') {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::Decimal)
    } else {
        s.parse::<i64>().ok().map(Number::Integer)
    }
}
