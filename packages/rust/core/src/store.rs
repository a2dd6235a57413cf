//! On-disk side of embedding: file naming, atomic writes, backups, status.
//!
//! For a document `dash.html` the related files are
//! `dash.html.backup` (pre-embed copy) and, unless embedding in place,
//! `dash_embedded.html` (the embedded variant). The splicer itself never
//! touches the filesystem; everything persistent goes through here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use dataembed_shared::{BackupRecord, EmbedError, Result, StoreOptions};

use crate::splice::Spliced;

/// The files that belong to one target document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub original: PathBuf,
    /// `None` when embedding overwrites the original.
    pub variant: Option<PathBuf>,
    pub backup: PathBuf,
}

impl DocumentPaths {
    pub fn for_document(document: &Path, opts: &StoreOptions) -> Self {
        let dir = document.parent().unwrap_or_else(|| Path::new(""));
        let file_name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let backup = dir.join(format!("{file_name}{}", opts.backup_suffix));
        let variant = (!opts.in_place).then(|| {
            let stem = document
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = match document.extension() {
                Some(ext) => format!("{stem}{}.{}", opts.variant_suffix, ext.to_string_lossy()),
                None => format!("{stem}{}", opts.variant_suffix),
            };
            dir.join(name)
        });

        Self {
            original: document.to_path_buf(),
            variant,
            backup,
        }
    }

    /// Where embedded output is written.
    pub fn output(&self) -> &Path {
        self.variant.as_deref().unwrap_or(&self.original)
    }
}

/// Read a whole UTF-8 file.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| EmbedError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| EmbedError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

/// Remove a file, treating "already gone" as success. Returns whether it existed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(EmbedError::io(path, e)),
    }
}

/// Load the backup for a document, if one was taken.
pub fn load_backup(paths: &DocumentPaths) -> Result<Option<BackupRecord>> {
    if !paths.backup.exists() {
        return Ok(None);
    }
    let content = read_text(&paths.backup)?;
    Ok(Some(BackupRecord {
        document: paths.original.clone(),
        content,
        taken_at: modified_at(&paths.backup).unwrap_or_else(Utc::now),
    }))
}

/// Persist an embed: backup first, then the embedded output.
///
/// When embedding in place an existing backup is kept, so it always holds
/// the document as it was before the first embed.
pub fn persist_embed(paths: &DocumentPaths, spliced: &Spliced) -> Result<()> {
    if paths.variant.is_some() || !paths.backup.exists() {
        write_atomic(&paths.backup, &spliced.backup.content)?;
    }
    write_atomic(paths.output(), &spliced.document)
}

/// Re-create a deleted backup next to an up-to-date variant. Returns whether
/// it wrote one.
///
/// In-place documents are skipped: once embedded, the original no longer
/// holds the pre-embed text.
pub fn restore_missing_backup(paths: &DocumentPaths, spliced: &Spliced) -> Result<bool> {
    if paths.variant.is_none() || paths.backup.exists() {
        return Ok(false);
    }
    write_atomic(&paths.backup, &spliced.backup.content)?;
    Ok(true)
}

/// Write the restored original and discard the backup and embedded variant.
pub fn persist_revert(paths: &DocumentPaths, original: &str) -> Result<()> {
    write_atomic(&paths.original, original)?;
    remove_if_exists(&paths.backup)?;
    if let Some(variant) = &paths.variant {
        remove_if_exists(variant)?;
    }
    Ok(())
}

/// A dataset targeting a document, and whether its source file is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub name: String,
    pub source: PathBuf,
    pub source_exists: bool,
}

impl DatasetStatus {
    /// Metadata-only check of the source file.
    pub fn inspect(name: &str, source: &Path) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_path_buf(),
            source_exists: source.is_file(),
        }
    }
}

/// Which files of a document currently exist.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub document: PathBuf,
    pub datasets: Vec<DatasetStatus>,
    pub original: bool,
    /// Embedded output exists (the variant, or the backup when embedding in place).
    pub embedded: bool,
    pub backup: bool,
    pub backup_taken_at: Option<DateTime<Utc>>,
}

/// Read-only inspection of a document's files.
pub fn inspect(paths: &DocumentPaths, datasets: Vec<DatasetStatus>) -> DocumentStatus {
    let backup = paths.backup.exists();
    let embedded = match &paths.variant {
        Some(variant) => variant.exists(),
        None => backup,
    };
    DocumentStatus {
        document: paths.original.clone(),
        datasets,
        original: paths.original.exists(),
        embedded,
        backup,
        backup_taken_at: if backup { modified_at(&paths.backup) } else { None },
    }
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}
