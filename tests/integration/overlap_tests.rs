use refmatch::matching::FileMatcher;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_same_root_never_matches_itself() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"identical").unwrap();
    fs::write(dir.path().join("b.txt"), b"identical").unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(dir.path(), dir.path())
        .unwrap();

    // Every candidate is also a reference file
    assert_eq!(summary.excluded_overlap, 2);
    assert_eq!(summary.candidate_files, 0);
    assert!(report.is_empty());
}

#[test]
fn test_nested_candidates_root_excludes_reference_files() {
    let reference = tempdir().unwrap();
    let nested = reference.path().join("incoming");
    fs::create_dir(&nested).unwrap();
    fs::write(reference.path().join("a.txt"), b"0123456789").unwrap();
    fs::write(nested.join("copy.txt"), b"0123456789").unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), &nested)
        .unwrap();

    let copy = fs::canonicalize(nested.join("copy.txt")).unwrap();

    // copy.txt was walked as a reference file too, so it cannot be a candidate
    assert_eq!(summary.excluded_overlap, 1);
    assert_eq!(summary.reference_files, 2);
    assert!(report.matches.values().flatten().all(|c| *c != copy));
    assert!(report.is_empty());
}

#[test]
fn test_nested_reference_root_keeps_other_candidates() {
    let candidates = tempdir().unwrap();
    let reference = candidates.path().join("originals");
    fs::create_dir(&reference).unwrap();
    fs::write(reference.join("photo.raw"), b"pixels").unwrap();
    fs::write(candidates.path().join("photo-copy.raw"), b"pixels").unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(&reference, candidates.path())
        .unwrap();

    let photo = fs::canonicalize(reference.join("photo.raw")).unwrap();
    let expected: Vec<PathBuf> =
        vec![fs::canonicalize(candidates.path().join("photo-copy.raw")).unwrap()];

    assert_eq!(summary.excluded_overlap, 1);
    assert_eq!(report.matches[&photo], expected);
}
