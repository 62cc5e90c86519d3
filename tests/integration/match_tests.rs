use refmatch::matching::{FileMatcher, MatcherConfig, SizePredicate};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

#[test]
fn test_identical_content_confirmed_same_size_different_content_rejected() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("a.txt"), b"0123456789").unwrap();
    fs::write(candidates.path().join("b.txt"), b"0123456789").unwrap();
    fs::write(candidates.path().join("c.txt"), b"abcdefghij").unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    let a = canonical(&reference.path().join("a.txt"));
    let b = canonical(&candidates.path().join("b.txt"));
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[&a], vec![b]);

    // c.txt passed the size stage but not the content stage
    assert_eq!(report.size_matches[&a].len(), 2);
    assert_eq!(summary.size_matched_pairs, 2);
    assert_eq!(summary.confirmed_pairs, 1);
}

#[test]
fn test_approximate_size_match_rejected_by_content() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("x.bin"), vec![0u8; 1000]).unwrap();
    fs::write(candidates.path().join("y.bin"), vec![1u8; 1005]).unwrap();

    let config = MatcherConfig::default().with_size_predicate(SizePredicate::approximate());
    let (report, summary) = FileMatcher::new(config)
        .run(reference.path(), candidates.path())
        .unwrap();

    let x = canonical(&reference.path().join("x.bin"));
    assert!(report.size_matches.contains_key(&x));
    assert!(report.is_empty());
    assert_eq!(summary.size_matched_references, 1);
    assert_eq!(summary.confirmed_references, 0);
}

#[test]
fn test_exact_mode_ignores_near_sizes() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("x.bin"), vec![0u8; 1000]).unwrap();
    fs::write(candidates.path().join("y.bin"), vec![0u8; 1005]).unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    assert!(report.size_matches.is_empty());
    assert!(report.is_empty());
    assert_eq!(summary.signed_files, 0);
}

#[test]
fn test_tolerance_boundary() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("r.bin"), vec![7u8; 1000]).unwrap();
    fs::write(candidates.path().join("inside.bin"), vec![7u8; 1010]).unwrap();
    fs::write(candidates.path().join("outside.bin"), vec![7u8; 1011]).unwrap();

    let config = MatcherConfig::default().with_size_predicate(SizePredicate::approximate());
    let (report, _) = FileMatcher::new(config)
        .run(reference.path(), candidates.path())
        .unwrap();

    let r = canonical(&reference.path().join("r.bin"));
    assert_eq!(
        report.size_matches[&r],
        vec![canonical(&candidates.path().join("inside.bin"))]
    );
    // Different lengths never share a digest
    assert!(report.is_empty());
}

#[test]
fn test_zero_size_reference_in_tolerant_mode() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("empty"), b"").unwrap();
    fs::write(candidates.path().join("also_empty"), b"").unwrap();
    fs::write(candidates.path().join("one_byte"), b"x").unwrap();

    let config = MatcherConfig::default().with_size_predicate(SizePredicate::approximate());
    let (report, _) = FileMatcher::new(config)
        .run(reference.path(), candidates.path())
        .unwrap();

    let empty = canonical(&reference.path().join("empty"));
    assert_eq!(
        report.matches[&empty],
        vec![canonical(&candidates.path().join("also_empty"))]
    );
}

#[test]
fn test_multiple_matches_in_traversal_order() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::create_dir(candidates.path().join("nested")).unwrap();
    fs::write(reference.path().join("a.txt"), b"same content").unwrap();
    fs::write(candidates.path().join("b.txt"), b"same content").unwrap();
    fs::write(candidates.path().join("nested").join("c.txt"), b"same content").unwrap();
    fs::write(candidates.path().join("a.txt"), b"same content").unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    let a = canonical(&reference.path().join("a.txt"));
    let expected: Vec<PathBuf> = ["a.txt", "b.txt", "nested/c.txt"]
        .iter()
        .map(|p| canonical(&candidates.path().join(p)))
        .collect();
    assert_eq!(report.matches[&a], expected);
    assert_eq!(summary.confirmed_pairs, 3);
}

#[test]
fn test_reference_without_size_match_is_absent() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("lonely.txt"), b"nobody has this size").unwrap();
    fs::write(candidates.path().join("other.txt"), b"tiny").unwrap();

    let (report, _) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    assert!(report.size_matches.is_empty());
    assert!(report.matches.is_empty());
}

#[test]
fn test_empty_directories() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();

    let (report, summary) = FileMatcher::with_defaults()
        .run(reference.path(), candidates.path())
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.reference_files, 0);
    assert_eq!(summary.candidate_files, 0);
}

#[test]
fn test_sequential_run_matches_parallel_run() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    for i in 0..12 {
        let content = format!("file number {:02}", i % 4);
        fs::write(reference.path().join(format!("r{}.txt", i)), &content).unwrap();
        fs::write(candidates.path().join(format!("c{}.txt", i)), &content).unwrap();
    }

    let sequential = FileMatcher::new(MatcherConfig::default().with_io_threads(1))
        .run(reference.path(), candidates.path())
        .unwrap()
        .0;
    let parallel = FileMatcher::new(MatcherConfig::default().with_io_threads(8))
        .run(reference.path(), candidates.path())
        .unwrap()
        .0;

    assert_eq!(sequential.matches, parallel.matches);
    assert_eq!(sequential.matches.len(), 12);
}
