//! Output formatters for match results.
//!
//! - Text for people (the default)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use refmatch::cli::OutputFormat;
//! use refmatch::matching::FileMatcher;
//! use refmatch::output::render;
//! use std::path::Path;
//!
//! let matcher = FileMatcher::with_defaults();
//! let (report, summary) = matcher.run(Path::new("ref"), Path::new("cand")).unwrap();
//!
//! render(&report, &summary, OutputFormat::Json, std::io::stdout()).unwrap();
//! ```

use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::cli::OutputFormat;
use crate::matching::{MatchReport, MatchSummary};

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::text::TextOutput;

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Write the report in the requested format.
///
/// # Errors
///
/// Returns an error if the writer fails or serialization fails.
pub fn render<W: Write>(
    report: &MatchReport,
    summary: &MatchSummary,
    format: OutputFormat,
    writer: W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(report, summary).write_to(writer),
        OutputFormat::Json => JsonOutput::new(report, summary).write_to(writer),
        OutputFormat::Csv => CsvOutput::new(report).write_to(writer),
    }
}

/// Lossy UTF-8 form of a path for machine-readable output.
pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
