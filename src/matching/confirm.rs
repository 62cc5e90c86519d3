//! Content confirmation of size matches.
//!
//! # Overview
//!
//! Every distinct path in a [`SizeMatchMapping`] is signed exactly once, even
//! when a candidate sits under several references. Signing runs on a bounded
//! rayon pool; each worker produces one result per path and the results are
//! merged into a [`SignatureCache`] after the parallel stage. Comparison then
//! happens sequentially against the cache.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::size::SizeMatchMapping;
use crate::progress::ProgressCallback;
use crate::signer::{ContentSignature, ContentSigner, SignatureError};

/// Reference path to the candidate paths whose content matches.
///
/// References without any confirmed candidate are absent.
pub type ConfirmedMatchMapping = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Settings for the confirmation stage.
#[derive(Clone)]
pub struct ConfirmConfig {
    /// Number of I/O threads used for signing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ConfirmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ConfirmConfig {
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Signatures computed during one run, keyed by path.
#[derive(Debug, Default)]
pub struct SignatureCache {
    entries: HashMap<PathBuf, ContentSignature>,
}

impl SignatureCache {
    /// Look up the signature of a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&ContentSignature> {
        self.entries.get(path)
    }

    /// Number of cached signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was signed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a signature for a path.
    pub fn insert(&mut self, path: PathBuf, signature: ContentSignature) {
        self.entries.insert(path, signature);
    }
}

/// Result of the confirmation stage.
#[derive(Debug, Default)]
pub struct ConfirmOutcome {
    /// Confirmed matches
    pub matches: ConfirmedMatchMapping,
    /// Files that could not be signed (excluded from matching)
    pub failures: Vec<SignatureError>,
    /// Number of files successfully signed
    pub signed_files: usize,
    /// Whether signing stopped early because of a shutdown request
    pub interrupted: bool,
}

/// Distinct paths of a mapping: references first, then candidates in order of appearance.
fn distinct_paths(mapping: &SizeMatchMapping) -> Vec<PathBuf> {
    let mut seen: HashSet<&PathBuf> = HashSet::new();
    let mut ordered = Vec::new();

    for reference in mapping.keys() {
        if seen.insert(reference) {
            ordered.push(reference.clone());
        }
    }
    for candidate in mapping.values().flatten() {
        if seen.insert(candidate) {
            ordered.push(candidate.clone());
        }
    }

    ordered
}

/// Sign a single path, honoring shutdown and reporting progress.
///
/// `completed` is shared by all workers; progress reports how many files
/// have finished, not the position of this one.
fn sign_one(
    path: PathBuf,
    signer: &dyn ContentSigner,
    config: &ConfirmConfig,
    completed: &AtomicUsize,
) -> (PathBuf, Result<ContentSignature, SignatureError>) {
    if config.is_shutdown_requested() {
        return (path, Err(SignatureError::Interrupted));
    }

    let result = signer.sign(&path);

    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    if let Some(ref callback) = config.progress_callback {
        callback.on_progress(done, path.to_string_lossy().as_ref());
    }

    (path, result)
}

/// Sign every path once, in parallel on a pool of `config.io_threads` workers.
pub fn sign_paths(
    paths: Vec<PathBuf>,
    signer: &dyn ContentSigner,
    config: &ConfirmConfig,
) -> (SignatureCache, Vec<SignatureError>, bool) {
    let completed = AtomicUsize::new(0);
    let work = || -> Vec<(PathBuf, Result<ContentSignature, SignatureError>)> {
        paths
            .into_par_iter()
            .map(|path| sign_one(path, signer, config, &completed))
            .collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(work),
        Err(e) => {
            log::warn!(
                "Failed to create signing thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            work()
        }
    };

    let mut cache = SignatureCache::default();
    let mut failures = Vec::new();
    let mut interrupted = false;

    for (path, result) in results {
        match result {
            Ok(signature) => {
                log::trace!("{} signature for {}", signature.kind(), path.display());
                cache.insert(path, signature);
            }
            Err(SignatureError::Interrupted) => interrupted = true,
            Err(e) => {
                log::warn!("Excluding file that cannot be signed: {}", e);
                failures.push(e);
            }
        }
    }

    (cache, failures, interrupted || config.is_shutdown_requested())
}

/// Confirm size matches by content signature.
///
/// Each reference keeps, in order, the candidates whose signature matches its
/// own under [`ContentSignature::matches`]. References or candidates that
/// could not be signed take no part in matching.
#[must_use]
pub fn confirm(
    mapping: &SizeMatchMapping,
    signer: &dyn ContentSigner,
    config: &ConfirmConfig,
) -> ConfirmOutcome {
    let paths = distinct_paths(mapping);
    if paths.is_empty() {
        log::debug!("Confirmation: nothing to sign");
        return ConfirmOutcome::default();
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("signing", paths.len());
    }
    log::info!("Signing {} files", paths.len());

    let (cache, failures, interrupted) = sign_paths(paths, signer, config);

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("signing");
    }

    if interrupted {
        log::info!("Confirmation: Interrupted by shutdown signal");
        return ConfirmOutcome {
            matches: ConfirmedMatchMapping::new(),
            signed_files: cache.len(),
            failures,
            interrupted: true,
        };
    }

    let matches = compare_signatures(mapping, &cache);

    ConfirmOutcome {
        matches,
        signed_files: cache.len(),
        failures,
        interrupted: false,
    }
}

/// Apply the comparison rule to every size-matched pair using cached signatures.
#[must_use]
pub fn compare_signatures(
    mapping: &SizeMatchMapping,
    cache: &SignatureCache,
) -> ConfirmedMatchMapping {
    let mut confirmed = ConfirmedMatchMapping::new();

    for (reference, candidates) in mapping {
        let Some(reference_sig) = cache.get(reference) else {
            log::debug!("No signature for reference {}", reference.display());
            continue;
        };

        let matched: Vec<PathBuf> = candidates
            .iter()
            .filter(|candidate| {
                cache
                    .get(candidate)
                    .is_some_and(|candidate_sig| reference_sig.matches(candidate_sig))
            })
            .cloned()
            .collect();

        if matched.is_empty() {
            log::debug!(
                "Size matches for {} differ in content",
                reference.display()
            );
            continue;
        }

        log::debug!(
            "Confirmed {} match(es) for {}",
            matched.len(),
            reference.display()
        );
        confirmed.insert(reference.clone(), matched);
    }

    confirmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::ExactDigestSigner;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Counts how often each path is signed.
    #[derive(Default)]
    struct CountingSigner {
        calls: Mutex<HashMap<PathBuf, usize>>,
        inner: ExactDigestSigner,
    }

    impl ContentSigner for CountingSigner {
        fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default() += 1;
            self.inner.sign(path)
        }
    }

    #[derive(Default)]
    struct PhaseCounter {
        started: AtomicUsize,
        ticks: AtomicUsize,
        positions: Mutex<Vec<usize>>,
    }

    impl ProgressCallback for PhaseCounter {
        fn on_phase_start(&self, _phase: &str, _total: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_progress(&self, current: usize, _path: &str) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            self.positions.lock().unwrap().push(current);
        }
        fn on_phase_end(&self, _phase: &str) {}
    }

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_confirm_keeps_identical_content_only() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"0123456789");
        let b = write(&dir, "b.txt", b"0123456789");
        let c = write(&dir, "c.txt", b"abcdefghij");

        let mut mapping = SizeMatchMapping::new();
        mapping.insert(a.clone(), vec![b.clone(), c]);

        let outcome = confirm(&mapping, &ExactDigestSigner::new(), &ConfirmConfig::default());

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[&a], vec![b]);
        assert_eq!(outcome.signed_files, 3);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_confirm_omits_references_without_matches() {
        let dir = TempDir::new().unwrap();
        let x = write(&dir, "x.bin", &[1u8; 1000]);
        let y = write(&dir, "y.bin", &[2u8; 1005]);

        let mut mapping = SizeMatchMapping::new();
        mapping.insert(x, vec![y]);

        let outcome = confirm(&mapping, &ExactDigestSigner::new(), &ConfirmConfig::default());

        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn test_each_path_signed_once() {
        let dir = TempDir::new().unwrap();
        let r1 = write(&dir, "r1", b"same");
        let r2 = write(&dir, "r2", b"same");
        let shared = write(&dir, "shared", b"same");

        let mut mapping = SizeMatchMapping::new();
        mapping.insert(r1.clone(), vec![shared.clone()]);
        mapping.insert(r2.clone(), vec![shared.clone()]);

        let signer = CountingSigner::default();
        let outcome = confirm(&mapping, &signer, &ConfirmConfig::default());

        assert_eq!(outcome.matches.len(), 2);
        let calls = signer.calls.lock().unwrap();
        assert_eq!(calls[&shared], 1);
        assert_eq!(calls[&r1], 1);
        assert_eq!(calls[&r2], 1);
    }

    #[test]
    fn test_unreadable_candidate_is_excluded() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"content");
        let b = write(&dir, "b", b"content");
        let gone = dir.path().join("gone");

        let mut mapping = SizeMatchMapping::new();
        mapping.insert(a.clone(), vec![gone, b.clone()]);

        let outcome = confirm(&mapping, &ExactDigestSigner::new(), &ConfirmConfig::default());

        assert_eq!(outcome.matches[&a], vec![b]);
        assert_eq!(outcome.failures.len(), 1);
    }

    #[test]
    fn test_single_thread_matches_parallel() {
        let dir = TempDir::new().unwrap();
        let mut mapping = SizeMatchMapping::new();
        for i in 0..8 {
            let r = write(&dir, &format!("r{i}"), format!("payload-{}", i % 3).as_bytes());
            let c = write(&dir, &format!("c{i}"), format!("payload-{}", i % 2).as_bytes());
            mapping.insert(r, vec![c]);
        }

        let sequential = ConfirmConfig {
            io_threads: 1,
            ..Default::default()
        };
        let parallel = ConfirmConfig {
            io_threads: 4,
            ..Default::default()
        };

        let signer = ExactDigestSigner::new();
        assert_eq!(
            confirm(&mapping, &signer, &sequential).matches,
            confirm(&mapping, &signer, &parallel).matches
        );
    }

    #[test]
    fn test_shutdown_interrupts_confirmation() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"x");
        let b = write(&dir, "b", b"x");
        let mut mapping = SizeMatchMapping::new();
        mapping.insert(a, vec![b]);

        let config = ConfirmConfig {
            shutdown_flag: Some(Arc::new(AtomicBool::new(true))),
            ..Default::default()
        };
        let outcome = confirm(&mapping, &ExactDigestSigner::new(), &config);

        assert!(outcome.interrupted);
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn test_progress_reported_per_file() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"x");
        let b = write(&dir, "b", b"x");
        let mut mapping = SizeMatchMapping::new();
        mapping.insert(a, vec![b]);

        let counter = Arc::new(PhaseCounter::default());
        let callback: Arc<dyn ProgressCallback> = counter.clone();
        let config = ConfirmConfig {
            progress_callback: Some(callback),
            ..Default::default()
        };
        let _ = confirm(&mapping, &ExactDigestSigner::new(), &config);

        assert_eq!(counter.started.load(Ordering::SeqCst), 1);
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_mapping() {
        let outcome = confirm(
            &SizeMatchMapping::new(),
            &ExactDigestSigner::new(),
            &ConfirmConfig::default(),
        );
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.signed_files, 0);
    }

    #[test]
    fn test_parallel_progress_counts_completions() {
        let dir = TempDir::new().unwrap();
        let mut mapping = SizeMatchMapping::new();
        for i in 0..6 {
            let reference = write(&dir, &format!("r{}.bin", i), &[i as u8; 64]);
            let candidates = (0..3)
                .map(|j| write(&dir, &format!("c{}_{}.bin", i, j), &[j as u8; 64]))
                .collect();
            mapping.insert(reference, candidates);
        }

        let counter = Arc::new(PhaseCounter::default());
        let callback: Arc<dyn ProgressCallback> = counter.clone();
        let config = ConfirmConfig {
            io_threads: 4,
            progress_callback: Some(callback),
            ..Default::default()
        };
        let outcome = confirm(&mapping, &ExactDigestSigner::new(), &config);

        // 6 references plus 18 distinct candidates
        assert_eq!(outcome.signed_files, 24);
        let mut positions = counter.positions.lock().unwrap().clone();
        positions.sort_unstable();
        assert_eq!(positions, (1..=24).collect::<Vec<_>>());
    }
}
