//! End-to-end runs: source → records → literal → anchor block → disk.
//!
//! Datasets are grouped by target document. Each document is read once,
//! its anchor block is recomposed from every dataset that targets it, and
//! the result is written once. A failing dataset or document is recorded in
//! the [`RunReport`] and the run moves on.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use dataembed_literal::{BuildOptions, PeriodRule, RenderOptions, build_records, render};
use dataembed_shared::{DatasetSpec, EmbedError, Orientation, PipelineConfig, Result};

use crate::splice::{self, Statement};
use crate::store::{self, DatasetStatus, DocumentPaths, DocumentStatus};
use crate::table::{self, SourceKind};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Row bookkeeping for a dataset built from a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub kept: usize,
    pub dropped_empty: usize,
    pub dropped_duplicate: usize,
}

/// What happened to one dataset/document pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// A fresh literal was written.
    Embedded,
    /// The fresh literal matched what was already on disk; nothing written.
    Unchanged,
    Reverted,
    Skipped { reason: String },
}

/// One line of the run summary.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub dataset: String,
    pub document: PathBuf,
    pub kind: OutcomeKind,
    /// `None` for literal sources and for skipped datasets.
    pub counts: Option<RecordCounts>,
}

/// Summary of a whole `embed` or `revert` run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    /// Files written during the run.
    pub written: Vec<PathBuf>,
    pub elapsed: std::time::Duration,
}

impl RunReport {
    /// A run succeeds when at least one dataset produced output.
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| !matches!(o.kind, OutcomeKind::Skipped { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, OutcomeKind::Skipped { .. }))
    }

    fn skip_all(&mut self, datasets: &[&DatasetSpec], reason: &str) {
        for spec in datasets {
            self.push(spec, OutcomeKind::Skipped { reason: reason.to_string() }, None);
        }
    }

    fn push(&mut self, spec: &DatasetSpec, kind: OutcomeKind, counts: Option<RecordCounts>) {
        self.outcomes.push(Outcome {
            dataset: spec.name.clone(),
            document: spec.document.clone(),
            kind,
            counts,
        });
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when starting work on a document.
    fn phase(&self, name: &str);
    /// Called before each dataset is processed.
    fn dataset(&self, name: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn dataset(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Embed
// ---------------------------------------------------------------------------

/// Embed every configured dataset into its document.
#[instrument(skip_all, fields(datasets = config.datasets.len()))]
pub fn embed_all(config: &PipelineConfig, progress: &dyn ProgressReporter) -> RunReport {
    let start = Instant::now();
    let mut report = RunReport::default();
    let total = config.datasets.len();
    let mut current = 0;

    for (document, datasets) in group_by_document(&config.datasets) {
        progress.phase(&format!("Embedding into {}", document.display()));
        for spec in &datasets {
            current += 1;
            progress.dataset(&spec.name, current, total);
        }
        embed_document(config, &document, &datasets, &mut report);
    }

    report.elapsed = start.elapsed();
    info!(
        outcomes = report.outcomes.len(),
        skipped = report.skipped().count(),
        written = report.written.len(),
        "embed run complete"
    );
    progress.done(&report);
    report
}

/// A literal ready to splice, with counts when it was built from a table.
struct Produced {
    literal: String,
    counts: Option<RecordCounts>,
}

fn embed_document(
    config: &PipelineConfig,
    document: &Path,
    datasets: &[&DatasetSpec],
    report: &mut RunReport,
) {
    let paths = DocumentPaths::for_document(document, &config.store);

    let original = match store::read_text(&paths.original) {
        Ok(text) => text,
        Err(e) => {
            warn!(document = %document.display(), error = %e, "document unreadable");
            report.skip_all(datasets, &e.to_string());
            return;
        }
    };
    if let Err(e) = splice::locate(&original, &config.anchor) {
        warn!(document = %document.display(), error = %e, "document has no anchor");
        report.skip_all(datasets, &e.to_string());
        return;
    }

    // What is on disk now: the variant when one was written, else the original.
    let current = match &paths.variant {
        Some(variant) => store::read_text(variant).ok(),
        None => Some(original.clone()),
    };

    let mut statements = Vec::with_capacity(datasets.len());
    let mut results: Vec<(&DatasetSpec, std::result::Result<Option<RecordCounts>, String>)> =
        Vec::with_capacity(datasets.len());

    for spec in datasets {
        match produce_literal(spec, config.indent) {
            Ok(produced) => {
                statements.push(Statement {
                    variable: spec.variable.clone(),
                    literal: produced.literal,
                });
                results.push((*spec, Ok(produced.counts)));
            }
            Err(e) => {
                let mut reason = e.to_string();
                let previous = current.as_deref().and_then(|doc| {
                    splice::previous_literal(doc, &config.anchor, &spec.variable)
                });
                match previous {
                    Some(span) => {
                        statements.push(Statement {
                            variable: spec.variable.clone(),
                            literal: span.text,
                        });
                        reason.push_str("; previous data kept");
                    }
                    None => reason.push_str("; omitted from document"),
                }
                warn!(dataset = %spec.name, %reason, "dataset skipped");
                results.push((*spec, Err(reason)));
            }
        }
    }

    if results.iter().all(|(_, r)| r.is_err()) {
        info!(document = %document.display(), "no fresh data, document left untouched");
        for (spec, result) in results {
            if let Err(reason) = result {
                report.push(spec, OutcomeKind::Skipped { reason }, None);
            }
        }
        return;
    }

    let block = splice::compose_block(&statements, config.indent);
    let written = splice::embed(&paths.original, &original, &config.anchor, &block).and_then(
        |spliced| {
            if current.as_deref() == Some(spliced.document.as_str()) {
                if store::restore_missing_backup(&paths, &spliced)? {
                    warn!(backup = %paths.backup.display(), "backup was missing, re-created");
                    report.written.push(paths.backup.clone());
                }
                return Ok(false);
            }
            store::persist_embed(&paths, &spliced)?;
            Ok(true)
        },
    );

    match written {
        Ok(changed) => {
            if changed {
                report.written.push(paths.output().to_path_buf());
            }
            info!(
                document = %document.display(),
                output = %paths.output().display(),
                changed,
                "document embedded"
            );
            let kind = if changed {
                OutcomeKind::Embedded
            } else {
                OutcomeKind::Unchanged
            };
            for (spec, result) in results {
                match result {
                    Ok(counts) => report.push(spec, kind.clone(), counts),
                    Err(reason) => report.push(spec, OutcomeKind::Skipped { reason }, None),
                }
            }
        }
        Err(e) => {
            warn!(document = %document.display(), error = %e, "embed failed");
            let reason = e.to_string();
            for (spec, _) in results {
                report.push(spec, OutcomeKind::Skipped { reason: reason.clone() }, None);
            }
        }
    }
}

/// Build the literal for one dataset from its source.
fn produce_literal(spec: &DatasetSpec, indent: usize) -> Result<Produced> {
    match SourceKind::from_path(&spec.source)? {
        SourceKind::Literal => Ok(Produced {
            literal: table::load_literal(&spec.source, &spec.variable)?,
            counts: None,
        }),
        SourceKind::Csv | SourceKind::Json => {
            let mut source = table::load_table(&spec.source)?;
            if spec.orientation == Orientation::Columns {
                source = source.transpose();
            }

            let opts = BuildOptions {
                category_prefix: spec.category_prefix.clone(),
                sign_policy: spec.sign_policy,
                period_rule: PeriodRule::from_pattern(spec.period_pattern.as_deref())?,
            };
            let outcome = build_records(&source, &opts);
            if outcome.periods.is_empty() {
                return Err(EmbedError::table(format!(
                    "{}: header row has no period columns",
                    spec.source.display()
                )));
            }

            let literal = render(
                &outcome.records,
                &outcome.periods,
                &RenderOptions {
                    label_key: spec.label_key.clone(),
                    indent,
                },
            );
            info!(
                dataset = %spec.name,
                records = outcome.records.len(),
                dropped_empty = outcome.dropped_empty,
                dropped_duplicate = outcome.dropped_duplicate,
                periods = outcome.periods.len(),
                "records built"
            );

            Ok(Produced {
                literal,
                counts: Some(RecordCounts {
                    kept: outcome.records.len(),
                    dropped_empty: outcome.dropped_empty,
                    dropped_duplicate: outcome.dropped_duplicate,
                }),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

/// Restore every configured document from its backup.
#[instrument(skip_all, fields(datasets = config.datasets.len()))]
pub fn revert_all(config: &PipelineConfig, progress: &dyn ProgressReporter) -> RunReport {
    let start = Instant::now();
    let mut report = RunReport::default();
    let total = config.datasets.len();
    let mut current = 0;

    for (document, datasets) in group_by_document(&config.datasets) {
        progress.phase(&format!("Reverting {}", document.display()));
        for spec in &datasets {
            current += 1;
            progress.dataset(&spec.name, current, total);
        }

        let paths = DocumentPaths::for_document(&document, &config.store);
        let restored = store::load_backup(&paths)
            .and_then(|backup| splice::revert(&paths.original, backup.as_ref()))
            .and_then(|original| store::persist_revert(&paths, &original));

        match restored {
            Ok(()) => {
                info!(document = %document.display(), "document reverted");
                report.written.push(paths.original.clone());
                for spec in &datasets {
                    report.push(spec, OutcomeKind::Reverted, None);
                }
            }
            Err(e) => {
                warn!(document = %document.display(), error = %e, "revert skipped");
                report.skip_all(&datasets, &e.to_string());
            }
        }
    }

    report.elapsed = start.elapsed();
    progress.done(&report);
    report
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Which files exist for every configured document. Reads metadata only.
pub fn status(config: &PipelineConfig) -> Vec<DocumentStatus> {
    group_by_document(&config.datasets)
        .into_iter()
        .map(|(document, datasets)| {
            let paths = DocumentPaths::for_document(&document, &config.store);
            let sources = datasets
                .iter()
                .map(|d| DatasetStatus::inspect(&d.name, &d.source))
                .collect();
            store::inspect(&paths, sources)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Datasets grouped by document, both in configuration order.
fn group_by_document(datasets: &[DatasetSpec]) -> Vec<(PathBuf, Vec<&DatasetSpec>)> {
    let mut groups: Vec<(PathBuf, Vec<&DatasetSpec>)> = Vec::new();
    for spec in datasets {
        match groups.iter_mut().find(|(doc, _)| *doc == spec.document) {
            Some((_, members)) => members.push(spec),
            None => groups.push((spec.document.clone(), vec![spec])),
        }
    }
    groups
}
