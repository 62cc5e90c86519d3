use refmatch::cli::OutputFormat;
use refmatch::matching::FileMatcher;
use refmatch::output::render;
use std::fs;
use tempfile::tempdir;

fn scenario() -> (tempfile::TempDir, tempfile::TempDir) {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("a.txt"), b"0123456789").unwrap();
    fs::write(candidates.path().join("b.txt"), b"0123456789").unwrap();
    fs::write(candidates.path().join("c.txt"), b"abcdefghij").unwrap();
    (reference, candidates)
}

#[test]
fn test_text_output_lists_single_match() {
    yansi::disable();
    let (reference, candidates) = scenario();
    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    let mut buf = Vec::new();
    render(&report, &summary, OutputFormat::Text, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let a = fs::canonicalize(reference.path().join("a.txt")).unwrap();
    let b = fs::canonicalize(candidates.path().join("b.txt")).unwrap();
    assert!(text.contains(&format!("{} -> {}", a.display(), b.display())));
    assert!(!text.contains("c.txt"));
}

#[test]
fn test_json_output_round_trips_through_serde() {
    let (reference, candidates) = scenario();
    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    let mut buf = Vec::new();
    render(&report, &summary, OutputFormat::Json, &mut buf).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

    assert_eq!(value["matches"].as_array().unwrap().len(), 1);
    assert_eq!(value["summary"]["confirmed_pairs"], 1);
    assert_eq!(value["summary"]["size_matched_pairs"], 2);
}

#[test]
fn test_csv_output_has_one_row_per_pair() {
    let (reference, candidates) = scenario();
    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    let mut buf = Vec::new();
    render(&report, &summary, OutputFormat::Csv, &mut buf).unwrap();
    let csv = String::from_utf8(buf).unwrap();

    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().nth(1).unwrap().ends_with("b.txt"));
}
