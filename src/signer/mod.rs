//! Content signatures for confirming size matches.
//!
//! Two signature kinds exist:
//! - [`ContentSignature::Exact`]: a BLAKE3 digest of the whole file, computed by
//!   [`ExactDigestSigner`]. Equal iff byte-identical.
//! - [`ContentSignature::Perceptual`]: a perceptual hash of sampled video frames,
//!   computed by [`PerceptualVideoSigner`]. Compared with a Hamming-distance
//!   threshold so re-encoded copies still match.
//!
//! The matching pipeline only sees the [`ContentSigner`] trait. [`SignerPolicy`]
//! is the implementation it is normally handed: it picks the perceptual signer
//! for recognized video extensions when video mode is on and falls back to the
//! digest whenever video processing fails.
//!
//! Signatures identify identical content for de-duplication purposes. They
//! are not meant to resist an adversary crafting collisions.

pub mod digest;
pub mod video;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image_hasher::ImageHash;

pub use digest::{hash_to_hex, Digest, ExactDigestSigner, CHUNK_SIZE};
pub use video::{PerceptualVideoSigner, VideoTools, DEFAULT_VIDEO_THRESHOLD};

/// File extensions (lowercase) eligible for perceptual video signing.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Returns true if the path has a recognized video extension (case-insensitive).
#[must_use]
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Perceptual hash of a video together with the tolerance it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptualSignature {
    hash: ImageHash,
    threshold: u32,
}

impl PerceptualSignature {
    /// Wrap a perceptual hash with its Hamming-distance threshold.
    #[must_use]
    pub fn new(hash: ImageHash, threshold: u32) -> Self {
        Self { hash, threshold }
    }

    /// Hamming distance to another perceptual signature.
    #[must_use]
    pub fn distance(&self, other: &Self) -> u32 {
        self.hash.dist(&other.hash)
    }

    /// Whether `other` differs from this signature beyond this signature's threshold.
    ///
    /// The threshold of the receiver governs, so `a.is_different(b)` and
    /// `b.is_different(a)` can disagree when the two were built with
    /// different thresholds.
    #[must_use]
    pub fn is_different(&self, other: &Self) -> bool {
        self.distance(other) > self.threshold
    }
}

/// A content signature for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSignature {
    /// Byte-exact digest.
    Exact(Digest),
    /// Perceptual video signature.
    Perceptual(PerceptualSignature),
}

impl ContentSignature {
    /// Apply the comparison rule for this signature against a candidate's.
    ///
    /// Exact digests match when identical, perceptual signatures match when
    /// not different, and mixed kinds never match.
    #[must_use]
    pub fn matches(&self, candidate: &ContentSignature) -> bool {
        match (self, candidate) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Perceptual(a), Self::Perceptual(b)) => !a.is_different(b),
            _ => false,
        }
    }

    /// Short name of the signature kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exact(_) => "digest",
            Self::Perceptual(_) => "perceptual",
        }
    }
}

impl std::fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(digest) => write!(f, "blake3:{}", hash_to_hex(digest)),
            Self::Perceptual(sig) => write!(f, "video:{}", sig.hash.to_base64()),
        }
    }
}

/// Errors that can occur while computing a content signature.
#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    /// The file could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Video-specific processing failed. Recovered by the digest fallback.
    #[error("Video signature failed for {path}: {reason}")]
    Video {
        /// Video file being signed
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Signing stopped because shutdown was requested.
    #[error("Signing interrupted")]
    Interrupted,
}

/// Something that can compute a [`ContentSignature`] for a file.
pub trait ContentSigner: Send + Sync {
    /// Compute the signature of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the file cannot be signed.
    fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError>;
}

/// The signer handed to the matching pipeline.
///
/// Always able to produce a digest. When a video signer is attached, files
/// with a recognized video extension are signed perceptually first; if that
/// fails, the failure is logged and the file is digested instead.
pub struct SignerPolicy {
    digest: ExactDigestSigner,
    video: Option<Box<dyn ContentSigner>>,
    fallbacks: AtomicUsize,
}

impl SignerPolicy {
    /// Policy that only ever computes exact digests.
    #[must_use]
    pub fn exact(digest: ExactDigestSigner) -> Self {
        Self {
            digest,
            video: None,
            fallbacks: AtomicUsize::new(0),
        }
    }

    /// Policy that signs video files perceptually with `video`.
    #[must_use]
    pub fn with_video(digest: ExactDigestSigner, video: Box<dyn ContentSigner>) -> Self {
        Self {
            digest,
            video: Some(video),
            fallbacks: AtomicUsize::new(0),
        }
    }

    /// Whether video mode is active.
    #[must_use]
    pub fn video_mode(&self) -> bool {
        self.video.is_some()
    }

    /// Number of video files that fell back to the digest so far.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SignerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerPolicy")
            .field("digest", &self.digest)
            .field("video", &self.video.as_ref().map(|_| "<video signer>"))
            .field("fallbacks", &self.fallback_count())
            .finish()
    }
}

impl ContentSigner for SignerPolicy {
    fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
        if let Some(ref video) = self.video {
            if is_video_path(path) {
                match video.sign(path) {
                    Ok(signature) => return Ok(signature),
                    Err(SignatureError::Interrupted) => return Err(SignatureError::Interrupted),
                    Err(e) => {
                        log::warn!("{}; falling back to content digest", e);
                        self.fallbacks.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        self.digest.sign(path)
    }
}
