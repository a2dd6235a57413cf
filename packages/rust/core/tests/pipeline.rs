//! End-to-end runs against real files in a temp directory.

use std::fs;
use std::path::Path;

use dataembed_core::pipeline::{self, OutcomeKind, SilentProgress};
use dataembed_shared::{AppConfig, DatasetEntry, DefaultsConfig, PipelineConfig};

const DOCUMENT: &str = "<html>\n<head><script src=\"chart.js\"></script></head>\n<body>\n<!-- Embedded data -->\n<script>\n  const embeddedDataA = [];\n</script>\n<script>draw(embeddedDataA);</script>\n</body>\n</html>\n";

const ENERGY_JSON: &str = r#"{"rows": [
    ["Category", 2020, "2021"],
    ["Coal", 100, null],
    ["Gas", {"value": "(5)", "highlighted": true}],
    ["Empty", null, ""],
    ["Coal", 1, 2]
]}"#;

fn dataset(name: &str, source: &str, document: &str, variable: &str) -> DatasetEntry {
    DatasetEntry {
        name: name.into(),
        source: source.into(),
        document: document.into(),
        variable: variable.into(),
        label_key: None,
        category_prefix: None,
        orientation: Default::default(),
        parenthesized: Default::default(),
        period_pattern: None,
    }
}

fn config(dir: &Path, in_place: bool, datasets: Vec<DatasetEntry>) -> PipelineConfig {
    let app = AppConfig {
        defaults: DefaultsConfig {
            indent: 0,
            in_place,
            ..DefaultsConfig::default()
        },
        datasets,
    };
    PipelineConfig::resolve(&app, dir).expect("valid config")
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write fixture");
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("read file")
}

#[test]
fn embeds_table_into_variant_and_keeps_original() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "energy.json", ENERGY_JSON);
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
    );

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert!(report.succeeded());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].kind, OutcomeKind::Embedded);
    let counts = report.outcomes[0].counts.expect("counts");
    assert_eq!((counts.kept, counts.dropped_empty, counts.dropped_duplicate), (2, 1, 1));

    let embedded = read(dir.path(), "dash_embedded.html");
    assert!(embedded.contains(
        r#"<script>
const embeddedDataA = [{"category":"Coal","2020":100,"2021":null},{"category":"Gas","2020":"(5)","2021":null}];
</script>"#
    ));
    assert!(embedded.ends_with("<script>draw(embeddedDataA);</script>\n</body>\n</html>\n"));
    assert!(embedded.starts_with("<html>\n<head><script src=\"chart.js\"></script></head>"));

    assert_eq!(read(dir.path(), "dash.html"), DOCUMENT);
    assert_eq!(read(dir.path(), "dash.html.backup"), DOCUMENT);
}

#[test]
fn rerun_with_same_data_is_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "energy.json", ENERGY_JSON);
    let cfg = config(
        dir.path(),
        true,
        vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
    );

    let first = pipeline::embed_all(&cfg, &SilentProgress);
    assert_eq!(first.outcomes[0].kind, OutcomeKind::Embedded);
    let after_first = read(dir.path(), "dash.html");

    let second = pipeline::embed_all(&cfg, &SilentProgress);
    assert!(second.succeeded());
    assert_eq!(second.outcomes[0].kind, OutcomeKind::Unchanged);
    assert!(second.written.is_empty());
    assert_eq!(read(dir.path(), "dash.html"), after_first);
    assert_eq!(read(dir.path(), "dash.html.backup"), DOCUMENT);
}

#[test]
fn missing_anchor_leaves_document_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plain = "<html><body><p>no data here</p></body></html>\n";
    write(dir.path(), "dash.html", plain);
    write(dir.path(), "energy.json", ENERGY_JSON);
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
    );

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert!(!report.succeeded());
    match &report.outcomes[0].kind {
        OutcomeKind::Skipped { reason } => assert!(reason.contains("anchor not found")),
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "dash.html"), plain);
    assert!(!dir.path().join("dash.html.backup").exists());
    assert!(!dir.path().join("dash_embedded.html").exists());
}

#[test]
fn embed_then_revert_restores_original() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "energy.json", ENERGY_JSON);

    for in_place in [false, true] {
        let cfg = config(
            dir.path(),
            in_place,
            vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
        );
        assert!(pipeline::embed_all(&cfg, &SilentProgress).succeeded());

        let report = pipeline::revert_all(&cfg, &SilentProgress);
        assert!(report.succeeded());
        assert_eq!(report.outcomes[0].kind, OutcomeKind::Reverted);
        assert_eq!(read(dir.path(), "dash.html"), DOCUMENT);
        assert!(!dir.path().join("dash.html.backup").exists());
        assert!(!dir.path().join("dash_embedded.html").exists());
    }
}

#[test]
fn revert_without_backup_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
    );

    let report = pipeline::revert_all(&cfg, &SilentProgress);
    assert!(!report.succeeded());
    match &report.outcomes[0].kind {
        OutcomeKind::Skipped { reason } => assert!(reason.contains("no backup")),
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "dash.html"), DOCUMENT);
}

#[test]
fn status_reports_files_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "energy.json", ENERGY_JSON);
    let cfg = config(
        dir.path(),
        false,
        vec![
            dataset("energy", "energy.json", "dash.html", "embeddedDataA"),
            dataset("missing", "absent.csv", "dash.html", "embeddedDataB"),
        ],
    );

    let before = pipeline::status(&cfg);
    assert_eq!(before.len(), 1);
    assert!(before[0].original && !before[0].embedded && !before[0].backup);
    assert_eq!(before[0].datasets.len(), 2);
    assert_eq!(before[0].datasets[0].name, "energy");
    assert_eq!(before[0].datasets[0].source, dir.path().join("energy.json"));
    assert!(before[0].datasets[0].source_exists);
    assert_eq!(before[0].datasets[1].name, "missing");
    assert!(!before[0].datasets[1].source_exists);
    assert!(!dir.path().join("dash.html.backup").exists());
    assert!(!dir.path().join("absent.csv").exists());

    pipeline::embed_all(&cfg, &SilentProgress);
    let after = pipeline::status(&cfg);
    assert!(after[0].embedded && after[0].backup);
    assert!(after[0].backup_taken_at.is_some());
}

#[test]
fn literal_source_is_embedded_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(
        dir.path(),
        "data_a_embedded.js",
        "// exported\nconst embeddedDataA = [\n  {\"category\": \"a]b\", \"2020\": 1}\n];\n",
    );
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("energy", "data_a_embedded.js", "dash.html", "embeddedDataA")],
    );

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert_eq!(report.outcomes[0].kind, OutcomeKind::Embedded);
    assert!(report.outcomes[0].counts.is_none());
    assert!(read(dir.path(), "dash_embedded.html").contains(
        "const embeddedDataA = [\n  {\"category\": \"a]b\", \"2020\": 1}\n];\n</script>"
    ));
}

#[test]
fn several_datasets_share_one_anchor() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "a.csv", "Category,2020\nCoal,1\n");
    write(dir.path(), "b.csv", "Category,2020\nGas,\"1,234.5\"\n");
    let cfg = config(
        dir.path(),
        false,
        vec![
            dataset("a", "a.csv", "dash.html", "embeddedDataA"),
            dataset("b", "b.csv", "dash.html", "embeddedDataB"),
        ],
    );

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.written.len(), 1);

    let embedded = read(dir.path(), "dash_embedded.html");
    assert!(embedded.contains(
        "<script>\nconst embeddedDataA = [{\"category\":\"Coal\",\"2020\":1}];\nconst embeddedDataB = [{\"category\":\"Gas\",\"2020\":1234.5}];\n</script>"
    ));
}

#[test]
fn failing_dataset_keeps_previous_literal() {
    for (in_place, output) in [(true, "dash.html"), (false, "dash_embedded.html")] {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "dash.html", DOCUMENT);
        write(dir.path(), "a.csv", "Category,2020\nCoal,1\n");
        write(dir.path(), "b.csv", "Category,2020\nGas,2\n");
        let datasets = vec![
            dataset("a", "a.csv", "dash.html", "embeddedDataA"),
            dataset("b", "b.csv", "dash.html", "embeddedDataB"),
        ];
        let cfg = config(dir.path(), in_place, datasets);
        assert!(pipeline::embed_all(&cfg, &SilentProgress).succeeded());

        write(dir.path(), "a.csv", "Category,2020\nCoal,3\n");
        fs::remove_file(dir.path().join("b.csv")).expect("remove source");

        let report = pipeline::embed_all(&cfg, &SilentProgress);
        assert!(report.succeeded());
        assert_eq!(report.outcomes[0].kind, OutcomeKind::Embedded);
        match &report.outcomes[1].kind {
            OutcomeKind::Skipped { reason } => assert!(reason.contains("previous data kept")),
            other => panic!("expected skip, got {other:?}"),
        }

        let embedded = read(dir.path(), output);
        assert!(embedded.contains("const embeddedDataA = [{\"category\":\"Coal\",\"2020\":3}];"));
        assert!(embedded.contains("const embeddedDataB = [{\"category\":\"Gas\",\"2020\":2}];"));
    }
}

#[test]
fn all_datasets_failing_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "nohdr.csv", "Category,Notes\nCoal,text\n");
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("a", "nohdr.csv", "dash.html", "embeddedDataA")],
    );

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert!(!report.succeeded());
    assert!(report.written.is_empty());
    assert!(!dir.path().join("dash_embedded.html").exists());
    assert!(!dir.path().join("dash.html.backup").exists());
}

#[test]
fn carry_forward_matches_whole_variable_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "a.csv", "Category,2020\nCoal,1\n");
    write(dir.path(), "b.csv", "Category,2020\nGas,2\n");
    let cfg = config(
        dir.path(),
        true,
        vec![
            dataset("long", "a.csv", "dash.html", "embeddedDataA"),
            dataset("short", "b.csv", "dash.html", "DataA"),
        ],
    );
    assert!(pipeline::embed_all(&cfg, &SilentProgress).succeeded());

    fs::remove_file(dir.path().join("b.csv")).expect("remove source");
    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert!(report.succeeded());
    match &report.outcomes[1].kind {
        OutcomeKind::Skipped { reason } => assert!(reason.contains("previous data kept")),
        other => panic!("expected skip, got {other:?}"),
    }

    let embedded = read(dir.path(), "dash.html");
    assert!(embedded.contains("const embeddedDataA = [{\"category\":\"Coal\",\"2020\":1}];"));
    assert!(embedded.contains("\nconst DataA = [{\"category\":\"Gas\",\"2020\":2}];"));
    assert!(!embedded.contains("const DataA = [{\"category\":\"Coal\""));
}

#[test]
fn script_close_in_text_keeps_rerun_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "a.csv", "Category,2020\nCoal</script>x,1\n");
    let cfg = config(
        dir.path(),
        true,
        vec![dataset("a", "a.csv", "dash.html", "embeddedDataA")],
    );

    assert_eq!(
        pipeline::embed_all(&cfg, &SilentProgress).outcomes[0].kind,
        OutcomeKind::Embedded
    );
    let first = read(dir.path(), "dash.html");
    assert!(first.contains("\"Coal<\\/script>x\""));

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert_eq!(report.outcomes[0].kind, OutcomeKind::Unchanged);
    assert_eq!(read(dir.path(), "dash.html"), first);
}

#[test]
fn unchanged_run_recreates_deleted_backup() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "dash.html", DOCUMENT);
    write(dir.path(), "energy.json", ENERGY_JSON);
    let cfg = config(
        dir.path(),
        false,
        vec![dataset("energy", "energy.json", "dash.html", "embeddedDataA")],
    );
    assert!(pipeline::embed_all(&cfg, &SilentProgress).succeeded());
    fs::remove_file(dir.path().join("dash.html.backup")).expect("remove backup");

    let report = pipeline::embed_all(&cfg, &SilentProgress);
    assert_eq!(report.outcomes[0].kind, OutcomeKind::Unchanged);
    assert_eq!(read(dir.path(), "dash.html.backup"), DOCUMENT);
    assert_eq!(report.written, vec![dir.path().join("dash.html.backup")]);

    assert!(pipeline::revert_all(&cfg, &SilentProgress).succeeded());
    assert_eq!(read(dir.path(), "dash.html"), DOCUMENT);
}
