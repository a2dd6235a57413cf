//! Cell normalization, literal scanning, and record rendering.
//!
//! Everything in this crate works on in-memory values and text; no I/O.
//!
//! - [`normalize`]: raw cell → [`NormalizedValue`](dataembed_shared::NormalizedValue)
//! - [`scanner`]: find the `[...]`/`{...}` literal assigned to a variable
//! - [`records`]: build records from a table and render them as a literal

pub mod normalize;
pub mod records;
pub mod scanner;

pub use normalize::{Classified, apply_sign_policy, classify, normalize, normalize_with};
pub use records::{
    BuildOptions, BuildOutcome, PeriodRule, RenderOptions, build_records, period_columns,
    periods_of, render, value_literal,
};
pub use scanner::{ScanMiss, scan};
