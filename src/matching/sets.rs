//! Reference and candidate file sets.
//!
//! Traversal output becomes two [`FileSet`]s. The candidate side never
//! contains a path that the reference traversal produced: when the two roots
//! overlap, the reference side keeps the file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::progress::ProgressCallback;
use crate::scanner::{file_size, FileRecord, ScanError};

/// An ordered set of measured files, unique by path.
///
/// Iteration follows insertion order, which is traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    records: Vec<FileRecord>,
}

/// The files under the reference root.
pub type ReferenceSet = FileSet;

/// The files under the candidates root, minus anything in the reference set.
pub type CandidateSet = FileSet;

impl FileSet {
    /// Build a set from records, keeping the first record for a repeated path.
    #[must_use]
    pub fn from_records(records: Vec<FileRecord>) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let records = records
            .into_iter()
            .filter(|r| seen.insert(r.path.clone()))
            .collect();
        Self { records }
    }

    /// Number of files in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Returns true if a record with this path exists.
    #[must_use]
    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.records.iter().any(|r| r.path == path)
    }

    /// Total size of all files in the set.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Drop every candidate path that also came out of the reference traversal.
///
/// Returns the remaining candidates (order preserved) and how many were dropped.
#[must_use]
pub fn exclude_reference_paths(
    reference_paths: &[PathBuf],
    candidate_paths: Vec<PathBuf>,
) -> (Vec<PathBuf>, usize) {
    let reference: HashSet<&PathBuf> = reference_paths.iter().collect();
    let before = candidate_paths.len();

    let kept: Vec<PathBuf> = candidate_paths
        .into_iter()
        .filter(|path| {
            let overlap = reference.contains(path);
            if overlap {
                log::debug!("Excluding reference file from candidates: {}", path.display());
            }
            !overlap
        })
        .collect();

    let excluded = before - kept.len();
    (kept, excluded)
}

/// Outcome of measuring a list of paths.
#[derive(Debug, Default)]
pub struct MeasuredFiles {
    /// Files whose size could be read
    pub set: FileSet,
    /// Files that vanished or could not be stat'ed
    pub failures: Vec<ScanError>,
    /// Whether measurement stopped early because of a shutdown request
    pub interrupted: bool,
}

/// Measure each path's size, excluding files that fail.
///
/// `offset` is added to the progress position so one progress phase can
/// span several calls.
pub fn measure_files(
    paths: Vec<PathBuf>,
    progress: Option<&Arc<dyn ProgressCallback>>,
    shutdown_flag: Option<&Arc<AtomicBool>>,
    offset: usize,
) -> MeasuredFiles {
    let mut records = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for (idx, path) in paths.into_iter().enumerate() {
        if shutdown_flag.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::debug!("Sizing: Shutdown requested, stopping");
            return MeasuredFiles {
                set: FileSet::from_records(records),
                failures,
                interrupted: true,
            };
        }

        if let Some(callback) = progress {
            callback.on_progress(offset + idx + 1, path.to_string_lossy().as_ref());
        }

        match file_size(&path) {
            Ok(size) => {
                log::trace!("{} bytes: {}", size, path.display());
                records.push(FileRecord::new(path, size));
            }
            Err(e) => {
                log::warn!("Skipping file that cannot be measured: {}", e);
                failures.push(e);
            }
        }
    }

    MeasuredFiles {
        set: FileSet::from_records(records),
        failures,
        interrupted: false,
    }
}
