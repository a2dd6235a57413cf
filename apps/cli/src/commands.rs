//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dataembed_core::pipeline::{self, Outcome, OutcomeKind, ProgressReporter, RunReport};
use dataembed_shared::{CONFIG_FILE_NAME, PipelineConfig, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dataembed: embed spreadsheet data into HTML documents.
#[derive(Parser)]
#[command(
    name = "dataembed",
    version,
    about = "Embed tabular data into HTML documents as JavaScript literals.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./dataembed.toml, then ~/.dataembed/dataembed.toml).
    #[arg(long, global = true, env = "DATAEMBED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build every dataset and splice it into its document.
    Embed {
        /// Only embed the named dataset (can be specified multiple times).
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
    },

    /// Restore documents from their backups.
    Revert {
        /// Only revert documents of the named dataset (can be specified multiple times).
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
    },

    /// Show which originals, embedded variants and backups exist.
    Status {
        /// Print status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Where to write it (defaults to ./dataembed.toml).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dataembed=info",
        1 => "dataembed=debug",
        _ => "dataembed=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Embed { datasets } => cmd_embed(config_path, &datasets),
        Command::Revert { datasets } => cmd_revert(config_path, &datasets),
        Command::Status { json } => cmd_status(config_path, json),
        Command::Config { action } => match action {
            ConfigAction::Init { path } => {
                cmd_config_init(path.or_else(|| config_path.map(Path::to_path_buf)))
            }
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load and resolve the config, narrowed to `datasets` when any are named.
fn pipeline_config(explicit: Option<&Path>, datasets: &[String]) -> Result<PipelineConfig> {
    let loaded = load_config(explicit)?;
    let base_dir = loaded.base_dir()?;
    let config = PipelineConfig::resolve(&loaded.config, &base_dir)?.only(datasets)?;

    if config.datasets.is_empty() {
        return Err(eyre!(
            "no datasets configured; add [[datasets]] entries to {}",
            loaded
                .path
                .as_deref()
                .map_or_else(|| CONFIG_FILE_NAME.to_string(), |p| p.display().to_string())
        ));
    }

    info!(
        config = ?loaded.path,
        base_dir = %base_dir.display(),
        datasets = config.datasets.len(),
        "configuration loaded"
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_embed(config_path: Option<&Path>, datasets: &[String]) -> Result<()> {
    let config = pipeline_config(config_path, datasets)?;

    let reporter = CliProgress::new();
    let report = pipeline::embed_all(&config, &reporter);

    print_report("Embed", &report);
    finish(&report, "no dataset was embedded")
}

fn cmd_revert(config_path: Option<&Path>, datasets: &[String]) -> Result<()> {
    let config = pipeline_config(config_path, datasets)?;

    let reporter = CliProgress::new();
    let report = pipeline::revert_all(&config, &reporter);

    print_report("Revert", &report);
    finish(&report, "no document was reverted")
}

fn cmd_status(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = pipeline_config(config_path, &[])?;
    let statuses = pipeline::status(&config);

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    let yes_no = |present: bool| if present { "yes" } else { "no" };

    println!();
    println!(
        "  {:<40} {:<9} {:<9} {}",
        "Document", "Original", "Embedded", "Backup"
    );
    for status in &statuses {
        println!(
            "  {:<40} {:<9} {:<9} {}",
            status.document.display().to_string(),
            yes_no(status.original),
            yes_no(status.embedded),
            yes_no(status.backup),
        );
        if let Some(taken_at) = status.backup_taken_at {
            println!("    backup taken {}", taken_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        for dataset in &status.datasets {
            println!(
                "    {:<24} source {:<3} ({})",
                dataset.name,
                yes_no(dataset.source_exists),
                dataset.source.display()
            );
        }
    }
    println!();

    Ok(())
}

fn cmd_config_init(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let path = init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let loaded = load_config(config_path)?;
    match &loaded.path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config file found, showing defaults"),
    }
    let toml_str = toml::to_string_pretty(&loaded.config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(verb: &str, report: &RunReport) {
    println!();
    for outcome in &report.outcomes {
        println!("  {}", outcome_line(outcome));
    }
    println!();
    println!(
        "  {verb}: {} ok, {} skipped, {} file(s) written in {:.1}s",
        report.outcomes.len() - report.skipped().count(),
        report.skipped().count(),
        report.written.len(),
        report.elapsed.as_secs_f64()
    );
    println!();
}

fn outcome_line(outcome: &Outcome) -> String {
    let status = match &outcome.kind {
        OutcomeKind::Embedded => "embedded".to_string(),
        OutcomeKind::Unchanged => "unchanged".to_string(),
        OutcomeKind::Reverted => "reverted".to_string(),
        OutcomeKind::Skipped { reason } => format!("skipped ({reason})"),
    };
    let counts = outcome
        .counts
        .map(|c| {
            format!(
                " [{} records, {} empty, {} duplicate]",
                c.kept, c.dropped_empty, c.dropped_duplicate
            )
        })
        .unwrap_or_default();
    format!(
        "{:<24} {:<10} {}{counts}",
        outcome.dataset,
        status,
        outcome.document.display()
    )
}

/// Dataset-level skips are reported; only a run with no output fails.
fn finish(report: &RunReport, message: &str) -> Result<()> {
    if report.succeeded() {
        Ok(())
    } else {
        Err(eyre!("{message}"))
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn dataset(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Building [{current}/{total}] {name}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
