//! Splice rendered literals into a document's anchor block.
//!
//! An anchor is a marker comment followed by a script block:
//!
//! ```text
//! <!-- Embedded data -->
//! <script>
//!   const embeddedDataA = [...];
//! </script>
//! ```
//!
//! Embedding replaces the whole script block (open tag through close tag)
//! and leaves every byte outside it untouched. The untouched original is
//! returned as a [`BackupRecord`] so that [`revert`] is an exact inverse.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, instrument};

use dataembed_literal::scan;
use dataembed_shared::{AnchorRegion, AnchorSpec, BackupRecord, EmbedError, LiteralSpan, Result};

/// One `const <variable> = <literal>;` line of an anchor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub variable: String,
    pub literal: String,
}

/// Result of a successful embed: the new text and the pre-embed snapshot.
#[derive(Debug, Clone)]
pub struct Spliced {
    pub document: String,
    pub backup: BackupRecord,
}

/// Find the marker, then the first open/close tag pair after it.
pub fn locate(document: &str, anchor: &AnchorSpec) -> Result<AnchorRegion> {
    let marker_at = document
        .find(&anchor.marker)
        .ok_or_else(|| EmbedError::AnchorNotFound {
            marker: anchor.marker.clone(),
        })?;
    let after_marker = marker_at + anchor.marker.len();

    let missing_block = || EmbedError::AnchorNotFound {
        marker: format!(
            "{} followed by {}...{}",
            anchor.marker, anchor.open_tag, anchor.close_tag
        ),
    };

    let open_at = document[after_marker..]
        .find(&anchor.open_tag)
        .map(|i| after_marker + i)
        .ok_or_else(missing_block)?;
    let content_at = open_at + anchor.open_tag.len();
    let close_at = document[content_at..]
        .find(&anchor.close_tag)
        .map(|i| content_at + i)
        .ok_or_else(missing_block)?;

    Ok(AnchorRegion {
        start_marker: anchor.marker.clone(),
        script_open_tag: anchor.open_tag.clone(),
        script_close_tag: anchor.close_tag.clone(),
        start: open_at,
        end: close_at + anchor.close_tag.len(),
    })
}

/// Script block content for a set of statements, one per line.
pub fn compose_block(statements: &[Statement], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut block = String::from("\n");
    for statement in statements {
        block.push_str(&format!(
            "{pad}const {} = {};\n",
            statement.variable, statement.literal
        ));
    }
    block
}

/// Replace the anchor block's content with `block`.
///
/// The returned backup holds `document` exactly as it was passed in.
#[instrument(skip_all, fields(document = %document_id.display()))]
pub fn embed(
    document_id: &Path,
    document: &str,
    anchor: &AnchorSpec,
    block: &str,
) -> Result<Spliced> {
    let region = locate(document, anchor)?;

    let backup = BackupRecord {
        document: document_id.to_path_buf(),
        content: document.to_string(),
        taken_at: Utc::now(),
    };

    let mut updated = String::with_capacity(
        document.len() - (region.end - region.start)
            + anchor.open_tag.len()
            + block.len()
            + anchor.close_tag.len(),
    );
    updated.push_str(&document[..region.start]);
    updated.push_str(&anchor.open_tag);
    updated.push_str(block);
    updated.push_str(&anchor.close_tag);
    updated.push_str(&document[region.end..]);

    debug!(
        start = region.start,
        end = region.end,
        old_len = document.len(),
        new_len = updated.len(),
        "anchor block replaced"
    );

    Ok(Spliced {
        document: updated,
        backup,
    })
}

/// The literal currently embedded for `variable`, with offsets into `document`.
///
/// Only a `const <variable> = ` statement at the start of a line or after a
/// `;` counts, so `DataA` never matches inside `const embeddedDataA = `.
pub fn previous_literal(
    document: &str,
    anchor: &AnchorSpec,
    variable: &str,
) -> Option<LiteralSpan> {
    let region = locate(document, anchor).ok()?;
    let content = region.content(document);
    let statement = format!("const {variable} = ");

    let at = content.match_indices(&statement).map(|(i, _)| i).find(|&i| {
        content[..i]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == ';')
    })?;

    let offset = region.content_start() + at;
    let span = scan(&content[at..], variable).ok()?;
    Some(LiteralSpan {
        source_start: span.source_start + offset,
        source_end: span.source_end + offset,
        ..span
    })
}

/// The original document held by `backup`.
pub fn revert(document_id: &Path, backup: Option<&BackupRecord>) -> Result<String> {
    match backup {
        Some(b) if b.document == document_id => Ok(b.content.clone()),
        _ => Err(EmbedError::BackupMissing {
            document: document_id.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> AnchorSpec {
        AnchorSpec {
            marker: "<!-- Embedded data -->".into(),
            open_tag: "<script>".into(),
            close_tag: "</script>".into(),
        }
    }

    const DOC: &str = "<html>\n<script src=\"chart.js\"></script>\n<!-- Embedded data -->\n<script>\n  const embeddedDataA = [{\"category\":\"</x>\"}];\n  const other = {\"a\": [1]};\n</script>\n<script>app();</script>\n</html>\n";

    fn statement(variable: &str, literal: &str) -> Statement {
        Statement {
            variable: variable.into(),
            literal: literal.into(),
        }
    }

    #[test]
    fn locate_uses_block_after_marker() {
        let region = locate(DOC, &anchor()).expect("region");
        let block = &DOC[region.start..region.end];
        assert!(block.starts_with("<script>\n  const embeddedDataA"));
        assert!(block.ends_with("</script>"));
        assert!(!block.contains("app()"));
        assert!(region.content(DOC).contains("const other"));
    }

    #[test]
    fn locate_missing_marker_or_block() {
        let err = locate("<html><script></script></html>", &anchor()).unwrap_err();
        assert_eq!(err.kind(), "anchor-not-found");

        let err = locate("<!-- Embedded data --> <p>no script</p>", &anchor()).unwrap_err();
        assert!(err.to_string().contains("followed by <script>"));

        let err = locate("<!-- Embedded data --><script> never closed", &anchor()).unwrap_err();
        assert_eq!(err.kind(), "anchor-not-found");
    }

    #[test]
    fn embed_replaces_only_the_block() {
        let block = compose_block(&[statement("embeddedDataA", "[1,2]")], 4);
        let spliced = embed(Path::new("dash.html"), DOC, &anchor(), &block).expect("embed");

        assert!(spliced.document.starts_with(
            "<html>\n<script src=\"chart.js\"></script>\n<!-- Embedded data -->\n<script>\n    const embeddedDataA = [1,2];\n</script>"
        ));
        assert!(spliced.document.ends_with("</script>\n<script>app();</script>\n</html>\n"));
        assert!(!spliced.document.contains("const other"));
        assert_eq!(spliced.backup.content, DOC);
    }

    #[test]
    fn embed_then_revert_is_identity() {
        let block = compose_block(&[statement("x", "[]")], 2);
        let spliced = embed(Path::new("dash.html"), DOC, &anchor(), &block).expect("embed");
        let restored = revert(Path::new("dash.html"), Some(&spliced.backup)).expect("revert");
        assert_eq!(restored, DOC);
    }

    #[test]
    fn embed_is_idempotent() {
        let block = compose_block(&[statement("embeddedDataA", "[{\"a\":1}]")], 2);
        let once = embed(Path::new("d"), DOC, &anchor(), &block).expect("first");
        let twice = embed(Path::new("d"), &once.document, &anchor(), &block).expect("second");
        assert_eq!(once.document, twice.document);
    }

    #[test]
    fn revert_without_backup() {
        let err = revert(Path::new("dash.html"), None).unwrap_err();
        assert_eq!(err.kind(), "backup-missing");

        let foreign = BackupRecord {
            document: "other.html".into(),
            content: String::new(),
            taken_at: Utc::now(),
        };
        assert!(revert(Path::new("dash.html"), Some(&foreign)).is_err());
    }

    #[test]
    fn previous_literal_has_document_offsets() {
        let span = previous_literal(DOC, &anchor(), "other").expect("span");
        assert_eq!(span.text, "{\"a\": [1]}");
        assert_eq!(&DOC[span.source_start..span.source_end], span.text);

        let span = previous_literal(DOC, &anchor(), "embeddedDataA").expect("span");
        assert_eq!(span.text, "[{\"category\":\"</x>\"}]");

        assert!(previous_literal(DOC, &anchor(), "missing").is_none());
        assert!(previous_literal("no anchor", &anchor(), "other").is_none());
    }

    #[test]
    fn previous_literal_ignores_longer_names_ending_in_variable() {
        let doc = "<!-- Embedded data -->\n<script>\n  const embeddedDataA = [1];\n  const DataA = [2];\n</script>";
        let span = previous_literal(doc, &anchor(), "DataA").expect("span");
        assert_eq!(span.text, "[2]");
        assert_eq!(&doc[span.source_start..span.source_end], "[2]");

        let only_longer = "<!-- Embedded data --><script>const embeddedDataA = [1];</script>";
        assert!(previous_literal(only_longer, &anchor(), "DataA").is_none());

        let same_line = "<!-- Embedded data --><script>const a = [1];const DataA = [3];</script>";
        assert_eq!(
            previous_literal(same_line, &anchor(), "DataA").expect("span").text,
            "[3]"
        );
    }

    #[test]
    fn compose_block_layout() {
        let block = compose_block(
            &[statement("a", "[1]"), statement("b", "[\n  2\n]")],
            2,
        );
        assert_eq!(block, "\n  const a = [1];\n  const b = [\n  2\n];\n");
        assert_eq!(compose_block(&[], 2), "\n");
    }
}
