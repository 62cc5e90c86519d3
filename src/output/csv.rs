//! CSV output formatter.
//!
//! One row per confirmed pair, with a header:
//!
//! ```text
//! reference,candidate
//! /ref/a.txt,/cand/b.txt
//! ```

use std::io::Write;

use serde::Serialize;

use super::{path_string, OutputError};
use crate::matching::MatchReport;

#[derive(Debug, Serialize)]
struct CsvRow {
    reference: String,
    candidate: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a MatchReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a MatchReport) -> Self {
        Self { report }
    }

    /// Write all rows to the given writer.
    ///
    /// The header is written even when there are no matches.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(["reference", "candidate"])?;

        for (reference, candidates) in &self.report.matches {
            let reference = path_string(reference);
            for candidate in candidates {
                wtr.serialize(CsvRow {
                    reference: reference.clone(),
                    candidate: path_string(candidate),
                })?;
            }
        }

        wtr.flush()?;
        Ok(())
    }

    /// Render the CSV into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string(&self) -> Result<String, OutputError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
