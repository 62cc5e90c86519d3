//! Pipeline orchestration.
//!
//! # Overview
//!
//! [`FileMatcher`] runs the complete matching pipeline:
//! 1. **Walk** - Validate both roots and enumerate their files
//! 2. **Filter** - Drop candidates that the reference traversal already produced
//! 3. **Size** - Measure every file and pair references with size-compatible candidates
//! 4. **Confirm** - Sign each distinct path once and keep pairs whose signatures match
//!
//! # Example
//!
//! ```no_run
//! use refmatch::matching::{FileMatcher, MatcherConfig, SizePredicate};
//! use std::path::Path;
//!
//! let config = MatcherConfig::default().with_size_predicate(SizePredicate::approximate());
//! let matcher = FileMatcher::new(config);
//!
//! let (report, summary) = matcher
//!     .run(Path::new("/photos/originals"), Path::new("/photos/imported"))
//!     .unwrap();
//!
//! println!("{} references matched", summary.confirmed_references);
//! for (reference, matches) in &report.matches {
//!     println!("{} -> {:?}", reference.display(), matches);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::confirm::{confirm, ConfirmConfig, ConfirmedMatchMapping};
use super::sets::{exclude_reference_paths, measure_files};
use super::size::{match_sizes, pair_count, SizeMatchMapping, SizePredicate};
use crate::progress::ProgressCallback;
use crate::scanner::{ScanError, Walker, WalkerConfig};
use crate::signer::{
    ContentSigner, ExactDigestSigner, PerceptualVideoSigner, SignerPolicy, VideoTools,
    DEFAULT_VIDEO_THRESHOLD,
};

/// Configuration for the matching pipeline.
#[derive(Clone)]
pub struct MatcherConfig {
    /// Directory walking options (applied to both roots).
    pub walker: WalkerConfig,
    /// Size rule for the first stage.
    pub size_predicate: SizePredicate,
    /// Sign recognized video files perceptually.
    pub video_mode: bool,
    /// Hamming distance threshold for perceptual video signatures.
    pub video_threshold: u32,
    /// External tools used for video decoding.
    pub video_tools: VideoTools,
    /// Number of I/O threads for parallel signing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for MatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherConfig")
            .field("walker", &self.walker)
            .field("size_predicate", &self.size_predicate)
            .field("video_mode", &self.video_mode)
            .field("video_threshold", &self.video_threshold)
            .field("video_tools", &self.video_tools)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            walker: WalkerConfig::default(),
            size_predicate: SizePredicate::Exact,
            video_mode: false,
            video_threshold: DEFAULT_VIDEO_THRESHOLD,
            video_tools: VideoTools::default(),
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl MatcherConfig {
    /// Set the size rule.
    #[must_use]
    pub fn with_size_predicate(mut self, predicate: SizePredicate) -> Self {
        self.size_predicate = predicate;
        self
    }

    /// Enable or disable perceptual signing of video files.
    #[must_use]
    pub fn with_video_mode(mut self, enabled: bool) -> Self {
        self.video_mode = enabled;
        self
    }

    /// Set the perceptual similarity threshold.
    #[must_use]
    pub fn with_video_threshold(mut self, threshold: u32) -> Self {
        self.video_threshold = threshold;
        self
    }

    /// Set the ffmpeg/ffprobe locations.
    #[must_use]
    pub fn with_video_tools(mut self, tools: VideoTools) -> Self {
        self.video_tools = tools;
        self
    }

    /// Set the number of signing threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the directory walking options.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics gathered during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    /// Files measured under the reference root
    pub reference_files: usize,
    /// Files measured under the candidates root (after overlap exclusion)
    pub candidate_files: usize,
    /// Total bytes across measured reference files
    pub reference_bytes: u64,
    /// Total bytes across measured candidate files
    pub candidate_bytes: u64,
    /// Candidate paths dropped because the reference traversal produced them
    pub excluded_overlap: usize,
    /// References with at least one size-compatible candidate
    pub size_matched_references: usize,
    /// Reference/candidate pairs surviving the size stage
    pub size_matched_pairs: usize,
    /// Distinct files signed
    pub signed_files: usize,
    /// References with at least one confirmed match
    pub confirmed_references: usize,
    /// Confirmed reference/candidate pairs
    pub confirmed_pairs: usize,
    /// Video files that fell back to the content digest
    pub signature_fallbacks: usize,
    /// Directory entries that could not be read during the walk
    pub walk_errors: usize,
    /// Files excluded because they could not be measured or signed
    pub failed_files: usize,
    /// Messages for the excluded files, prefixed with the stage (`sizing` or `signing`)
    pub errors: Vec<String>,
    /// Wall-clock time of the run
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl MatchSummary {
    /// Whether any file was excluded because of an error.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_files > 0 || self.walk_errors > 0
    }
}

/// The mappings produced by a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    /// Canonical reference root
    pub reference_root: PathBuf,
    /// Canonical candidates root
    pub candidates_root: PathBuf,
    /// Size rule that was applied
    #[serde(serialize_with = "serialize_predicate")]
    pub size_predicate: SizePredicate,
    /// Whether video files were signed perceptually
    pub video_mode: bool,
    /// Pairs surviving the size stage
    #[serde(skip)]
    pub size_matches: SizeMatchMapping,
    /// Pairs confirmed by content
    pub matches: ConfirmedMatchMapping,
}

fn serialize_predicate<S: serde::Serializer>(
    predicate: &SizePredicate,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(predicate)
}

impl MatchReport {
    /// Returns true if nothing was confirmed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Errors that stop a run.
#[derive(thiserror::Error, Debug)]
pub enum MatcherError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// A root directory is missing or not a directory.
    #[error("Invalid {role} directory: {source}")]
    InvalidRoot {
        /// Which root failed ("reference" or "candidates")
        role: &'static str,
        /// What was wrong with it
        #[source]
        source: ScanError,
    },
}

/// Matches a candidate tree against a reference tree.
pub struct FileMatcher {
    config: MatcherConfig,
    signer: SignerPolicy,
}

impl FileMatcher {
    /// Create a matcher; video mode attaches the ffmpeg-backed perceptual signer.
    #[must_use]
    pub fn new(config: MatcherConfig) -> Self {
        let digest = Self::digest_signer(&config);
        let signer = if config.video_mode {
            SignerPolicy::with_video(
                digest,
                Box::new(PerceptualVideoSigner::new(
                    config.video_tools.clone(),
                    config.video_threshold,
                )),
            )
        } else {
            SignerPolicy::exact(digest)
        };

        Self { config, signer }
    }

    /// Create a matcher with a custom video signer.
    ///
    /// The signer is used only for recognized video extensions, with the same
    /// digest fallback as the built-in one.
    #[must_use]
    pub fn with_video_signer(config: MatcherConfig, video: Box<dyn ContentSigner>) -> Self {
        let digest = Self::digest_signer(&config);
        Self {
            config,
            signer: SignerPolicy::with_video(digest, video),
        }
    }

    /// Create a matcher with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(MatcherConfig::default())
    }

    fn digest_signer(config: &MatcherConfig) -> ExactDigestSigner {
        let digest = ExactDigestSigner::new();
        match config.shutdown_flag {
            Some(ref flag) => digest.with_shutdown_flag(Arc::clone(flag)),
            None => digest,
        }
    }

    fn walker(&self, root: &Path) -> Walker {
        let walker = Walker::new(root, self.config.walker.clone());
        match self.config.shutdown_flag {
            Some(ref flag) => walker.with_shutdown_flag(Arc::clone(flag)),
            None => walker,
        }
    }

    fn check_interrupted(&self) -> Result<(), MatcherError> {
        if self.config.is_shutdown_requested() {
            log::info!("Run interrupted by shutdown signal");
            return Err(MatcherError::Interrupted);
        }
        Ok(())
    }

    /// Walk one root, reporting progress and counting unreadable entries.
    fn walk_root(
        &self,
        walker: &Walker,
        role: &'static str,
    ) -> Result<(Vec<PathBuf>, usize), MatcherError> {
        let entries = walker
            .walk()
            .map_err(|source| MatcherError::InvalidRoot { role, source })?;

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {} directory", role));
        }

        let mut files = Vec::new();
        let mut errors = 0;
        for entry in entries {
            match entry {
                Ok(path) => {
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(files.len() + 1, path.to_string_lossy().as_ref());
                    }
                    files.push(path);
                }
                Err(e) => {
                    log::debug!("Walk error under {} root: {}", role, e);
                    errors += 1;
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }

        log::info!("Found {} files in {} directory", files.len(), role);
        Ok((files, errors))
    }

    /// Run the full pipeline over the two roots.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::InvalidRoot`] if either root is missing or not
    /// a directory, and [`MatcherError::Interrupted`] if shutdown was requested.
    /// Per-file failures never abort the run; they are counted in the summary.
    pub fn run(
        &self,
        reference_dir: &Path,
        candidates_dir: &Path,
    ) -> Result<(MatchReport, MatchSummary), MatcherError> {
        let start_time = Instant::now();
        let mut summary = MatchSummary::default();

        let reference_walker = self.walker(reference_dir);
        let candidates_walker = self.walker(candidates_dir);

        // Validate both roots before doing any work
        let reference_root = reference_walker
            .resolve_root()
            .map_err(|source| MatcherError::InvalidRoot {
                role: "reference",
                source,
            })?;
        let candidates_root = candidates_walker
            .resolve_root()
            .map_err(|source| MatcherError::InvalidRoot {
                role: "candidates",
                source,
            })?;

        let (reference_paths, reference_walk_errors) =
            self.walk_root(&reference_walker, "reference")?;
        self.check_interrupted()?;
        let (candidate_paths, candidate_walk_errors) =
            self.walk_root(&candidates_walker, "candidates")?;
        self.check_interrupted()?;
        summary.walk_errors = reference_walk_errors + candidate_walk_errors;

        let (candidate_paths, excluded) =
            exclude_reference_paths(&reference_paths, candidate_paths);
        summary.excluded_overlap = excluded;
        if excluded > 0 {
            log::info!(
                "Excluded {} candidate(s) that are also reference files",
                excluded
            );
        }

        // Sizing
        let total = reference_paths.len() + candidate_paths.len();
        let callback = self.config.progress_callback.as_ref();
        let shutdown = self.config.shutdown_flag.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("sizing", total);
        }
        let reference_count = reference_paths.len();
        let reference = measure_files(reference_paths, callback, shutdown, 0);
        let candidates = measure_files(candidate_paths, callback, shutdown, reference_count);
        if let Some(cb) = callback {
            cb.on_phase_end("sizing");
        }
        if reference.interrupted || candidates.interrupted {
            return Err(MatcherError::Interrupted);
        }

        summary.reference_files = reference.set.len();
        summary.candidate_files = candidates.set.len();
        summary.reference_bytes = reference.set.total_size();
        summary.candidate_bytes = candidates.set.total_size();
        for failure in reference.failures.iter().chain(candidates.failures.iter()) {
            summary.failed_files += 1;
            summary.errors.push(format!("sizing: {}", failure));
        }

        let size_matches =
            match_sizes(&reference.set, &candidates.set, self.config.size_predicate);
        summary.size_matched_references = size_matches.len();
        summary.size_matched_pairs = pair_count(&size_matches);
        log::info!(
            "Size stage ({}): {} of {} references, {} pairs",
            self.config.size_predicate,
            summary.size_matched_references,
            summary.reference_files,
            summary.size_matched_pairs
        );
        self.check_interrupted()?;

        let confirm_config = ConfirmConfig {
            io_threads: self.config.io_threads,
            shutdown_flag: self.config.shutdown_flag.clone(),
            progress_callback: self.config.progress_callback.clone(),
        };
        // The policy counts across runs of this matcher
        let fallbacks_before = self.signer.fallback_count();
        let outcome = confirm(&size_matches, &self.signer, &confirm_config);
        if outcome.interrupted {
            return Err(MatcherError::Interrupted);
        }

        summary.signed_files = outcome.signed_files;
        summary.signature_fallbacks = self
            .signer
            .fallback_count()
            .saturating_sub(fallbacks_before);
        for failure in &outcome.failures {
            summary.failed_files += 1;
            summary.errors.push(format!("signing: {}", failure));
        }
        summary.confirmed_references = outcome.matches.len();
        summary.confirmed_pairs = pair_count(&outcome.matches);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Confirmed {} pairs for {} references in {:.2?}",
            summary.confirmed_pairs,
            summary.confirmed_references,
            summary.scan_duration
        );

        let report = MatchReport {
            reference_root,
            candidates_root,
            size_predicate: self.config.size_predicate,
            video_mode: self.signer.video_mode(),
            size_matches,
            matches: outcome.matches,
        };

        Ok((report, summary))
    }
}
