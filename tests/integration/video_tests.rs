use image_hasher::ImageHash;
use refmatch::matching::{FileMatcher, MatcherConfig, SizePredicate};
use refmatch::signer::{ContentSignature, ContentSigner, PerceptualSignature, SignatureError, VideoTools};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Signs a "video" by its first byte, so files that start alike look alike.
struct FirstByteSigner {
    threshold: u32,
}

impl ContentSigner for FirstByteSigner {
    fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
        let bytes = fs::read(path).map_err(|source| SignatureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let first = bytes.first().copied().unwrap_or(0);
        let hash = ImageHash::from_bytes(&[first; 8]).unwrap();
        Ok(ContentSignature::Perceptual(PerceptualSignature::new(
            hash,
            self.threshold,
        )))
    }
}

fn missing_tools() -> VideoTools {
    VideoTools {
        ffmpeg: PathBuf::from("/nonexistent/refmatch-test/ffmpeg"),
        ffprobe: PathBuf::from("/nonexistent/refmatch-test/ffprobe"),
    }
}

#[test]
fn test_reencoded_video_matches_perceptually() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    let mut original = vec![0xAAu8; 1000];
    original[500] = 1;
    let mut reencoded = vec![0xAAu8; 1005];
    reencoded[700] = 2;
    fs::write(reference.path().join("clip.mp4"), &original).unwrap();
    fs::write(candidates.path().join("clip.mkv"), &reencoded).unwrap();

    let config = MatcherConfig::default().with_size_predicate(SizePredicate::approximate());
    let matcher = FileMatcher::with_video_signer(config, Box::new(FirstByteSigner { threshold: 0 }));
    let (report, summary) = matcher.run(reference.path(), candidates.path()).unwrap();

    let clip = fs::canonicalize(reference.path().join("clip.mp4")).unwrap();
    assert_eq!(
        report.matches[&clip],
        vec![fs::canonicalize(candidates.path().join("clip.mkv")).unwrap()]
    );
    assert!(report.video_mode);
    assert_eq!(summary.signature_fallbacks, 0);
}

#[test]
fn test_non_video_files_still_use_digest() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    // Same first byte, different content: only a perceptual signer would match these
    fs::write(reference.path().join("notes.txt"), b"AAAA1").unwrap();
    fs::write(candidates.path().join("notes.txt"), b"AAAA2").unwrap();

    let matcher = FileMatcher::with_video_signer(
        MatcherConfig::default(),
        Box::new(FirstByteSigner { threshold: 64 }),
    );
    let (report, _) = matcher.run(reference.path(), candidates.path()).unwrap();

    assert!(report.is_empty());
}

#[test]
fn test_video_against_non_video_never_matches() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("clip.mov"), b"same bytes").unwrap();
    fs::write(candidates.path().join("clip.bin"), b"same bytes").unwrap();

    let matcher = FileMatcher::with_video_signer(
        MatcherConfig::default(),
        Box::new(FirstByteSigner { threshold: 64 }),
    );
    let (report, _) = matcher.run(reference.path(), candidates.path()).unwrap();

    // Perceptual and digest signatures are different kinds
    assert!(report.is_empty());
}

#[test]
fn test_undecodable_videos_fall_back_to_digest() {
    let reference = tempdir().unwrap();
    let candidates = tempdir().unwrap();
    fs::write(reference.path().join("broken.mp4"), b"not really a video").unwrap();
    fs::write(candidates.path().join("copy.mp4"), b"not really a video").unwrap();
    fs::write(candidates.path().join("other.avi"), b"not really a vide0").unwrap();

    let config = MatcherConfig::default()
        .with_video_mode(true)
        .with_video_tools(missing_tools());
    let (report, summary) = FileMatcher::new(config)
        .run(reference.path(), candidates.path())
        .unwrap();

    let broken = fs::canonicalize(reference.path().join("broken.mp4")).unwrap();
    assert_eq!(
        report.matches[&broken],
        vec![fs::canonicalize(candidates.path().join("copy.mp4")).unwrap()]
    );
    assert_eq!(summary.signature_fallbacks, 3);
    assert!(!summary.has_failures());
}
