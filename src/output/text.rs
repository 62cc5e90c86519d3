//! Human-readable report.
//!
//! A reference with one confirmed match prints on a single line:
//!
//! ```text
//! /ref/a.txt -> /cand/b.txt
//! ```
//!
//! A reference with several matches is followed by an indented list:
//!
//! ```text
//! /ref/a.txt:
//!   1. /cand/b.txt
//!   2. /cand/copy/b.txt
//! ```
//!
//! An empty mapping prints `No matching files found.` Colors come from
//! `yansi` and follow its global switch, so `--no-color` is handled by the
//! caller.

use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use super::OutputError;
use crate::matching::{MatchReport, MatchSummary};

/// Message printed when nothing was confirmed.
pub const NO_MATCHES_MESSAGE: &str = "No matching files found.";

/// Text output formatter.
pub struct TextOutput<'a> {
    report: &'a MatchReport,
    summary: &'a MatchSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(report: &'a MatchReport, summary: &'a MatchSummary) -> Self {
        Self { report, summary }
    }

    /// Write the listing followed by the summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), OutputError> {
        if self.report.is_empty() {
            writeln!(writer, "{}", NO_MATCHES_MESSAGE.yellow())?;
        }

        for (reference, matches) in &self.report.matches {
            match matches.as_slice() {
                [single] => writeln!(
                    writer,
                    "{} -> {}",
                    reference.display().bold(),
                    single.display().green()
                )?,
                many => {
                    writeln!(writer, "{}:", reference.display().bold())?;
                    for (i, candidate) in many.iter().enumerate() {
                        writeln!(writer, "  {}. {}", i + 1, candidate.display().green())?;
                    }
                }
            }
        }

        writeln!(writer)?;
        writeln!(writer, "{}", self.summary_line())?;
        if self.summary.has_failures() {
            writeln!(
                writer,
                "{}",
                format!(
                    "{} file(s) skipped due to errors (run with -v for details)",
                    self.summary.failed_files + self.summary.walk_errors
                )
                .red()
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    fn summary_line(&self) -> String {
        let s = self.summary;
        let mut line = format!(
            "{} match(es) for {} of {} reference files ({}) against {} candidates ({}), size rule: {}",
            s.confirmed_pairs,
            s.confirmed_references,
            s.reference_files,
            ByteSize::b(s.reference_bytes),
            s.candidate_files,
            ByteSize::b(s.candidate_bytes),
            self.report.size_predicate,
        );
        if self.report.video_mode {
            line.push_str(&format!(
                ", videos compared perceptually ({} fallback(s))",
                s.signature_fallbacks
            ));
        }
        line.push_str(&format!(" in {:.2?}", s.scan_duration));
        line
    }
}
