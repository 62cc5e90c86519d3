//! Perceptual video signatures.
//!
//! A video is reduced to a single collage image: `ffprobe` reports the
//! duration, `ffmpeg` samples [`FRAME_SAMPLES`] evenly spaced frames, scales
//! each to a small square and tiles them into one PNG written to stdout.
//! The collage is hashed with a gradient (dHash-style) perceptual hash, which
//! stays stable across re-encoding, bitrate and container changes.
//!
//! Every step is fallible and reports [`SignatureError::Video`]. The caller
//! ([`super::SignerPolicy`]) recovers by digesting the file instead.

use std::path::{Path, PathBuf};
use std::process::Command;

use image_hasher::{HashAlg, HasherConfig};

use super::{ContentSignature, ContentSigner, PerceptualSignature, SignatureError};

/// Number of frames sampled per video (arranged as a square grid).
pub const FRAME_SAMPLES: u32 = 16;

/// Grid edge length of the collage.
const GRID: u32 = 4;

/// Edge length in pixels of each sampled frame inside the collage.
const TILE_EDGE: u32 = 64;

/// Default Hamming distance (out of 64 bits) under which videos are considered the same.
pub const DEFAULT_VIDEO_THRESHOLD: u32 = 10;

/// Locations of the external tools used to decode video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTools {
    /// `ffmpeg` executable
    pub ffmpeg: PathBuf,
    /// `ffprobe` executable
    pub ffprobe: PathBuf,
}

impl Default for VideoTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Computes perceptual signatures for video files.
pub struct PerceptualVideoSigner {
    tools: VideoTools,
    threshold: u32,
    hasher: image_hasher::Hasher,
}

impl PerceptualVideoSigner {
    /// Create a signer using the given tools and similarity threshold.
    #[must_use]
    pub fn new(tools: VideoTools, threshold: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(8, 8)
            .to_hasher();

        Self {
            tools,
            threshold,
            hasher,
        }
    }

    /// The Hamming-distance threshold attached to produced signatures.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn video_error(path: &Path, reason: impl Into<String>) -> SignatureError {
        SignatureError::Video {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Ask ffprobe for the container duration in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64, SignatureError> {
        let output = Command::new(&self.tools.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                Self::video_error(
                    path,
                    format!("cannot run {}: {}", self.tools.ffprobe.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(Self::video_error(
                path,
                format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| Self::video_error(path, "ffprobe reported no usable duration"))
    }

    /// Sample frames into a PNG collage and return the encoded bytes.
    fn extract_collage(&self, path: &Path, duration: f64) -> Result<Vec<u8>, SignatureError> {
        let filter = collage_filter(duration);
        log::trace!("Sampling {} with filter {}", path.display(), filter);

        let output = Command::new(&self.tools.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-vf",
                filter.as_str(),
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ])
            .output()
            .map_err(|e| {
                Self::video_error(
                    path,
                    format!("cannot run {}: {}", self.tools.ffmpeg.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(Self::video_error(
                path,
                format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        if output.stdout.is_empty() {
            return Err(Self::video_error(path, "ffmpeg produced no frames"));
        }

        Ok(output.stdout)
    }
}

impl ContentSigner for PerceptualVideoSigner {
    fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
        let duration = self.probe_duration(path)?;
        let collage = self.extract_collage(path, duration)?;

        let image = image::load_from_memory_with_format(&collage, image::ImageFormat::Png)
            .map_err(|e| Self::video_error(path, format!("undecodable collage: {}", e)))?;

        let hash = self.hasher.hash_image(&image);
        log::debug!(
            "Perceptual signature for {}: {}",
            path.display(),
            hash.to_base64()
        );

        Ok(ContentSignature::Perceptual(PerceptualSignature::new(
            hash,
            self.threshold,
        )))
    }
}

impl std::fmt::Debug for PerceptualVideoSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptualVideoSigner")
            .field("tools", &self.tools)
            .field("threshold", &self.threshold)
            .finish()
    }
}

/// Parse ffprobe's duration output; rejects non-finite and non-positive values.
fn parse_duration(raw: &str) -> Option<f64> {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Build the ffmpeg filter graph that tiles evenly spaced frames.
fn collage_filter(duration: f64) -> String {
    let rate = f64::from(FRAME_SAMPLES) / duration;
    format!(
        "fps={:.6},scale={}:{},tile={}x{}",
        rate, TILE_EDGE, TILE_EDGE, GRID, GRID
    )
}
