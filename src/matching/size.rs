//! Size-based candidate selection.
//!
//! # Overview
//!
//! The first pipeline stage: for every reference file, collect the candidate
//! files whose size is acceptable under the active [`SizePredicate`]. Only
//! these pairs are ever signed, so this stage eliminates most of the I/O.
//!
//! Candidates are indexed once by size; each reference then looks up its
//! acceptable size window with two binary searches. Matches are reported in
//! candidate traversal order.
//!
//! # Example
//!
//! ```
//! use refmatch::matching::{match_sizes, FileSet, SizePredicate};
//! use refmatch::scanner::FileRecord;
//! use std::path::PathBuf;
//!
//! let reference = FileSet::from_records(vec![FileRecord::new(PathBuf::from("/r/x.bin"), 1000)]);
//! let candidates = FileSet::from_records(vec![
//!     FileRecord::new(PathBuf::from("/c/y.bin"), 1010),
//!     FileRecord::new(PathBuf::from("/c/z.bin"), 1011),
//! ]);
//!
//! let mapping = match_sizes(&reference, &candidates, SizePredicate::approximate());
//! assert_eq!(mapping[&PathBuf::from("/r/x.bin")], vec![PathBuf::from("/c/y.bin")]);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::sets::{CandidateSet, ReferenceSet};

/// Relative tolerance used by `--approximate`, in percent of the reference size.
pub const APPROXIMATE_TOLERANCE_PERCENT: u8 = 1;

/// Reference path to the candidate paths whose size qualifies.
///
/// References without any qualifying candidate are absent.
pub type SizeMatchMapping = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Rule deciding whether a candidate's size is close enough to a reference's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePredicate {
    /// Sizes must be identical.
    #[default]
    Exact,
    /// Sizes may differ by up to `percent` percent of the reference size.
    Tolerant {
        /// Allowed deviation as a percentage of the reference size
        percent: u8,
    },
}

impl SizePredicate {
    /// The predicate selected by `--approximate`.
    #[must_use]
    pub fn approximate() -> Self {
        Self::Tolerant {
            percent: APPROXIMATE_TOLERANCE_PERCENT,
        }
    }

    /// Largest absolute size difference accepted for this reference size.
    ///
    /// Computed exactly in integer arithmetic. A zero-size reference allows
    /// no deviation at all.
    #[must_use]
    pub fn allowance(&self, reference_size: u64) -> u64 {
        match *self {
            Self::Exact => 0,
            Self::Tolerant { percent } => {
                let allowed = u128::from(reference_size) * u128::from(percent) / 100;
                u64::try_from(allowed).unwrap_or(u64::MAX)
            }
        }
    }

    /// Inclusive range of candidate sizes accepted for this reference size.
    #[must_use]
    pub fn bounds(&self, reference_size: u64) -> (u64, u64) {
        let allowed = self.allowance(reference_size);
        (
            reference_size.saturating_sub(allowed),
            reference_size.saturating_add(allowed),
        )
    }

    /// Whether a candidate of `candidate_size` qualifies for `reference_size`.
    #[must_use]
    pub fn accepts(&self, reference_size: u64, candidate_size: u64) -> bool {
        reference_size.abs_diff(candidate_size) <= self.allowance(reference_size)
    }
}

impl std::fmt::Display for SizePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Tolerant { percent } => write!(f, "within {}%", percent),
        }
    }
}

/// Pair every reference file with the candidates whose size qualifies.
#[must_use]
pub fn match_sizes(
    reference: &ReferenceSet,
    candidates: &CandidateSet,
    predicate: SizePredicate,
) -> SizeMatchMapping {
    let candidate_list: Vec<_> = candidates.iter().collect();

    // (size, traversal index), sorted by size for range lookups
    let mut by_size: Vec<(u64, usize)> = candidate_list
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.size, idx))
        .collect();
    by_size.sort_unstable();

    let mut mapping = SizeMatchMapping::new();

    for record in reference {
        let (low, high) = predicate.bounds(record.size);
        let start = by_size.partition_point(|&(size, _)| size < low);
        let end = by_size.partition_point(|&(size, _)| size <= high);

        if start >= end {
            continue;
        }

        let mut hits: Vec<usize> = by_size[start..end].iter().map(|&(_, idx)| idx).collect();
        hits.sort_unstable();

        let matched: Vec<PathBuf> = hits
            .into_iter()
            .map(|idx| candidate_list[idx])
            .filter(|candidate| predicate.accepts(record.size, candidate.size))
            .map(|candidate| candidate.path.clone())
            .collect();

        if matched.is_empty() {
            continue;
        }

        log::trace!(
            "Size match ({}): {} has {} candidate(s)",
            predicate,
            record.path.display(),
            matched.len()
        );
        mapping.insert(record.path.clone(), matched);
    }

    mapping
}

/// Total number of reference/candidate pairs in a mapping.
#[must_use]
pub fn pair_count(mapping: &BTreeMap<PathBuf, Vec<PathBuf>>) -> usize {
    mapping.values().map(Vec::len).sum()
}
