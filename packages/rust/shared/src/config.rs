//! Application configuration for dataembed.
//!
//! The dataset registry lives in `dataembed.toml`, looked up via `--config`,
//! then the working directory, then `~/.dataembed/`. The file schema
//! ([`AppConfig`]) is resolved once at startup into the runtime
//! [`PipelineConfig`] that the orchestrator threads through every run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EmbedError, Result};
use crate::types::AnchorSpec;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "dataembed.toml";

/// Config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dataembed";

// ---------------------------------------------------------------------------
// Config structs (matching dataembed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Registered datasets.
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Marker comment that precedes the data script block.
    #[serde(default = "default_marker")]
    pub marker: String,

    #[serde(default = "default_open_tag")]
    pub open_tag: String,

    #[serde(default = "default_close_tag")]
    pub close_tag: String,

    /// Key under which each record's category label is rendered.
    #[serde(default = "default_label_key")]
    pub label_key: String,

    /// Spaces per nesting level in rendered literals; 0 renders one line.
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Overwrite documents instead of writing an embedded variant next to them.
    #[serde(default)]
    pub in_place: bool,

    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    #[serde(default = "default_variant_suffix")]
    pub variant_suffix: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
            label_key: default_label_key(),
            indent: default_indent(),
            in_place: false,
            backup_suffix: default_backup_suffix(),
            variant_suffix: default_variant_suffix(),
        }
    }
}

fn default_marker() -> String {
    "<!-- Embedded data -->".into()
}
fn default_open_tag() -> String {
    "<script>".into()
}
fn default_close_tag() -> String {
    "</script>".into()
}
fn default_label_key() -> String {
    "category".into()
}
fn default_indent() -> usize {
    2
}
fn default_backup_suffix() -> String {
    ".backup".into()
}
fn default_variant_suffix() -> String {
    "_embedded".into()
}

/// Which way the source sheet is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Periods across the header row, one category per row.
    #[default]
    Rows,
    /// Periods down the first column, one category per column.
    Columns,
}

/// How parenthesized `(n)` cell values are turned into numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignPolicy {
    /// Keep the magnitude and flag the value.
    #[default]
    Flag,
    /// Accounting convention: the value is negative.
    Negate,
}

/// `[[datasets]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Unique dataset name.
    pub name: String,
    /// Source table (`.csv`, `.json`) or data file (`.js`).
    pub source: String,
    /// Target document holding the anchor.
    pub document: String,
    /// Variable the literal is assigned to.
    pub variable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_key: Option<String>,
    /// Prepended to every category label (e.g. `"Installed capacity - "`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_prefix: Option<String>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub parenthesized: SignPolicy,
    /// Regex a header cell must match to count as a period. Integers by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_pattern: Option<String>,
}

// ---------------------------------------------------------------------------
// Runtime config (resolved once at startup)
// ---------------------------------------------------------------------------

/// One dataset with paths resolved and overrides applied.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub name: String,
    pub source: PathBuf,
    pub document: PathBuf,
    pub variable: String,
    pub label_key: String,
    pub category_prefix: Option<String>,
    pub orientation: Orientation,
    pub sign_policy: SignPolicy,
    pub period_pattern: Option<String>,
}

/// File naming and write discipline for target documents.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub in_place: bool,
    pub backup_suffix: String,
    pub variant_suffix: String,
}

/// Everything a run needs, threaded through the orchestrator explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub anchor: AnchorSpec,
    pub indent: usize,
    pub store: StoreOptions,
    pub datasets: Vec<DatasetSpec>,
}

impl PipelineConfig {
    /// Resolve an [`AppConfig`] against the directory relative paths start from.
    pub fn resolve(config: &AppConfig, base_dir: &Path) -> Result<Self> {
        let defaults = &config.defaults;
        validate_defaults(defaults)?;

        let mut names = HashSet::new();
        let mut targets = HashSet::new();
        let mut datasets = Vec::with_capacity(config.datasets.len());

        for entry in &config.datasets {
            if entry.name.trim().is_empty() {
                return Err(EmbedError::validation("dataset name must not be empty"));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(EmbedError::validation(format!(
                    "duplicate dataset name '{}'",
                    entry.name
                )));
            }
            if !is_identifier(&entry.variable) {
                return Err(EmbedError::validation(format!(
                    "dataset '{}': '{}' is not a valid variable name",
                    entry.name, entry.variable
                )));
            }
            if let Some(pattern) = &entry.period_pattern {
                regex::Regex::new(pattern).map_err(|e| {
                    EmbedError::validation(format!(
                        "dataset '{}': invalid period_pattern: {e}",
                        entry.name
                    ))
                })?;
            }

            let document = base_dir.join(&entry.document);
            if !targets.insert((document.clone(), entry.variable.clone())) {
                return Err(EmbedError::validation(format!(
                    "dataset '{}': variable '{}' is already embedded into {}",
                    entry.name,
                    entry.variable,
                    document.display()
                )));
            }

            datasets.push(DatasetSpec {
                name: entry.name.clone(),
                source: base_dir.join(&entry.source),
                document,
                variable: entry.variable.clone(),
                label_key: entry
                    .label_key
                    .clone()
                    .unwrap_or_else(|| defaults.label_key.clone()),
                category_prefix: entry.category_prefix.clone(),
                orientation: entry.orientation,
                sign_policy: entry.parenthesized,
                period_pattern: entry.period_pattern.clone(),
            });
        }

        Ok(Self {
            anchor: AnchorSpec {
                marker: defaults.marker.clone(),
                open_tag: defaults.open_tag.clone(),
                close_tag: defaults.close_tag.clone(),
            },
            indent: defaults.indent,
            store: StoreOptions {
                in_place: defaults.in_place,
                backup_suffix: defaults.backup_suffix.clone(),
                variant_suffix: defaults.variant_suffix.clone(),
            },
            datasets,
        })
    }

    /// Keep only the named datasets. Unknown names are an error.
    pub fn only(mut self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        for name in names {
            if !self.datasets.iter().any(|d| &d.name == name) {
                return Err(EmbedError::config(format!("unknown dataset '{name}'")));
            }
        }
        self.datasets.retain(|d| names.contains(&d.name));
        Ok(self)
    }
}

fn validate_defaults(defaults: &DefaultsConfig) -> Result<()> {
    if defaults.marker.is_empty() || defaults.open_tag.is_empty() || defaults.close_tag.is_empty()
    {
        return Err(EmbedError::validation(
            "marker, open_tag and close_tag must not be empty",
        ));
    }
    if defaults.backup_suffix.is_empty() || defaults.variant_suffix.is_empty() {
        return Err(EmbedError::validation(
            "backup_suffix and variant_suffix must not be empty",
        ));
    }
    Ok(())
}

/// JS identifier check, ASCII subset.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// A parsed config together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// `None` when no config file exists and defaults are in use.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory that relative dataset paths resolve against.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self.path.as_deref().and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
            _ => std::env::current_dir().map_err(|e| EmbedError::io(".", e)),
        }
    }
}

/// Get the path to the user-level config directory (`~/.dataembed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EmbedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Find the config file: explicit path, then `./dataembed.toml`, then the user config.
pub fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(EmbedError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    // A missing home directory only means there is no user-level config.
    if let Ok(dir) = config_dir() {
        let user = dir.join(CONFIG_FILE_NAME);
        if user.exists() {
            return Ok(Some(user));
        }
    }

    Ok(None)
}

/// Load the config. Returns defaults (no datasets) if no file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    match find_config(explicit)? {
        Some(path) => Ok(LoadedConfig {
            config: load_config_from(&path)?,
            path: Some(path),
        }),
        None => {
            tracing::debug!("config file not found, using defaults");
            Ok(LoadedConfig {
                config: AppConfig::default(),
                path: None,
            })
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EmbedError::config(format!("failed to parse {}: {e}", path.display())))
}

const INIT_TEMPLATE_FOOTER: &str = r#"
# Register one [[datasets]] block per embedded variable:
#
# [[datasets]]
# name = "primary-energy"
# source = "data/a/primary_energy.csv"
# document = "dataset_a_primary_energy.html"
# variable = "embeddedDataA"
# orientation = "rows"      # or "columns"
# parenthesized = "flag"    # or "negate"
"#;

/// Write a default config file at `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(EmbedError::config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EmbedError::io(parent, e))?;
    }

    let config = AppConfig::default();
    let body = toml::to_string_pretty(&config).map_err(|e| EmbedError::config(e.to_string()))?;
    let content = format!("{body}{INIT_TEMPLATE_FOOTER}");

    std::fs::write(path, content).map_err(|e| EmbedError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path.to_path_buf())
}
