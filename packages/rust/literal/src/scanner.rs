//! Locate a declared array/object literal without parsing the surrounding text.
//!
//! The scanner finds `<name> = ` and then walks forward one character at a
//! time, tracking bracket depth and double-quoted string state, until the
//! depth returns to zero. Brackets and quotes inside strings never count.

use std::fmt;

use dataembed_shared::{EmbedError, LiteralSpan};
use tracing::trace;

/// Why a scan produced no span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMiss {
    /// No `<name> = ` declaration in the buffer.
    Undeclared,
    /// The declaration exists but no balanced literal follows it.
    Unterminated,
}

impl fmt::Display for ScanMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undeclared => f.write_str("declaration not found"),
            Self::Unterminated => f.write_str("literal is not balanced before end of input"),
        }
    }
}

impl ScanMiss {
    /// Surface the miss as a pipeline error for `variable`.
    pub fn into_error(self, variable: &str) -> EmbedError {
        EmbedError::MalformedLiteral {
            variable: variable.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Find the literal assigned to `variable` in `buffer`.
///
/// Only whitespace may separate `= ` from the opening bracket. The returned
/// span starts at that bracket and ends just past its matching close.
pub fn scan(buffer: &str, variable: &str) -> Result<LiteralSpan, ScanMiss> {
    let needle = format!("{variable} = ");
    let decl = buffer.find(&needle).ok_or(ScanMiss::Undeclared)?;
    let from = decl + needle.len();

    let mut depth: usize = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_pending = false;

    for (offset, ch) in buffer[from..].char_indices() {
        let pos = from + offset;

        if in_string {
            if escape_pending {
                escape_pending = false;
            } else if ch == '\\' {
                escape_pending = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match (ch, start) {
            ('[' | '{', None) => {
                start = Some(pos);
                depth = 1;
            }
            ('[' | '{', Some(_)) => depth += 1,
            (']' | '}', Some(begin)) => {
                depth -= 1;
                if depth == 0 {
                    let end = pos + ch.len_utf8();
                    trace!(variable, begin, end, "literal span found");
                    return Ok(LiteralSpan {
                        variable_name: variable.to_string(),
                        source_start: begin,
                        source_end: end,
                        text: buffer[begin..end].to_string(),
                    });
                }
            }
            ('"', Some(_)) => in_string = true,
            (c, None) if c.is_whitespace() => {}
            // anything but whitespace before the opening bracket
            (_, None) => return Err(ScanMiss::Unterminated),
            _ => {}
        }
    }

    Err(ScanMiss::Unterminated)
}
