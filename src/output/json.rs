//! JSON output formatter.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "reference_root": "/data/originals",
//!   "candidates_root": "/data/imported",
//!   "size_rule": "within 1%",
//!   "video_mode": false,
//!   "matches": [
//!     {
//!       "reference": "/data/originals/a.txt",
//!       "candidates": ["/data/imported/b.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "reference_files": 1,
//!     "candidate_files": 3,
//!     "confirmed_pairs": 1,
//!     "scan_duration_ms": 12
//!   }
//! }
//! ```
//!
//! The summary carries every [`MatchSummary`] counter; only a few are shown
//! above.

use std::io::Write;

use serde::Serialize;

use super::{path_string, OutputError};
use crate::matching::{MatchReport, MatchSummary};

/// One reference and its confirmed candidates.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatch {
    /// Reference file path
    pub reference: String,
    /// Matching candidate paths, in candidate traversal order
    pub candidates: Vec<String>,
}

/// Summary counters plus the run duration in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary<'a> {
    #[serde(flatten)]
    counters: &'a MatchSummary,
    /// Duration of the run in milliseconds
    scan_duration_ms: u64,
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Canonical reference root
    pub reference_root: String,
    /// Canonical candidates root
    pub candidates_root: String,
    /// Size rule that was applied ("exact" or "within 1%")
    pub size_rule: String,
    /// Whether videos were compared perceptually
    pub video_mode: bool,
    /// Confirmed matches, sorted by reference path
    pub matches: Vec<JsonMatch>,
    /// Run statistics
    pub summary: JsonSummary<'a>,
}

impl<'a> JsonOutput<'a> {
    /// Build the document from a report and its summary.
    #[must_use]
    pub fn new(report: &MatchReport, summary: &'a MatchSummary) -> Self {
        let matches = report
            .matches
            .iter()
            .map(|(reference, candidates)| JsonMatch {
                reference: path_string(reference),
                candidates: candidates.iter().map(|c| path_string(c)).collect(),
            })
            .collect();

        Self {
            reference_root: path_string(&report.reference_root),
            candidates_root: path_string(&report.candidates_root),
            size_rule: report.size_predicate.to_string(),
            video_mode: report.video_mode,
            matches,
            summary: JsonSummary {
                counters: summary,
                scan_duration_ms: u64::try_from(summary.scan_duration.as_millis())
                    .unwrap_or(u64::MAX),
            },
        }
    }

    /// Write pretty-printed JSON to the given writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), OutputError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
