//! Reference/candidate matching module.
//!
//! This module provides functionality for:
//! - Building reference and candidate file sets (reference paths take precedence)
//! - Size-based pairing (exact or 1% tolerant)
//! - Content confirmation (digest or perceptual video signature)
//! - Pipeline orchestration

pub mod confirm;
pub mod matcher;
pub mod sets;
pub mod size;

pub use confirm::{
    compare_signatures, confirm, sign_paths, ConfirmConfig, ConfirmOutcome,
    ConfirmedMatchMapping, SignatureCache,
};
pub use matcher::{FileMatcher, MatchReport, MatchSummary, MatcherConfig, MatcherError};
pub use sets::{
    exclude_reference_paths, measure_files, CandidateSet, FileSet, MeasuredFiles, ReferenceSet,
};
pub use size::{
    match_sizes, pair_count, SizeMatchMapping, SizePredicate, APPROXIMATE_TOLERANCE_PERCENT,
};
