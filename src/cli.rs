//! Command-line interface definitions for refmatch.
//!
//! This module defines all CLI arguments using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Exact size matching, byte-exact confirmation
//! refmatch ~/originals ~/imports
//!
//! # Allow 1% size difference and compare videos perceptually
//! refmatch ~/originals ~/imports --approximate --videos
//!
//! # JSON output for scripting
//! refmatch ~/originals ~/imports --output json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::signer::DEFAULT_VIDEO_THRESHOLD;

/// Match files between directories based on size and content.
///
/// For every file under REFERENCE_DIR, refmatch lists the files under
/// CANDIDATES_DIR with a compatible size and matching content.
#[derive(Debug, Parser)]
#[command(name = "refmatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing reference files
    #[arg(value_name = "REFERENCE_DIR")]
    pub reference_dir: PathBuf,

    /// Directory containing candidate files to match
    #[arg(value_name = "CANDIDATES_DIR")]
    pub candidates_dir: PathBuf,

    /// Accept candidates whose size is within 1% of the reference size
    #[arg(long)]
    pub approximate: bool,

    /// Compare video files (mp4, avi, mov, mkv) by perceptual similarity
    ///
    /// Requires ffmpeg and ffprobe. Videos that cannot be decoded are
    /// compared by exact content instead.
    #[arg(long)]
    pub videos: bool,

    /// Maximum perceptual hash distance (out of 64 bits) for videos to match
    #[arg(long, value_name = "BITS", default_value_t = DEFAULT_VIDEO_THRESHOLD)]
    pub video_threshold: u32,

    /// Path to the ffmpeg executable
    #[arg(long, value_name = "PATH", env = "REFMATCH_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Path to the ffprobe executable
    #[arg(
        long,
        value_name = "PATH",
        env = "REFMATCH_FFPROBE",
        default_value = "ffprobe"
    )]
    pub ffprobe: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Number of I/O threads for hashing (default: 4)
    ///
    /// Use 1 for a fully sequential run.
    #[arg(
        long,
        value_name = "N",
        env = "REFMATCH_IO_THREADS",
        default_value = "4",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub io_threads: u16,

    /// Follow symbolic links while walking
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress and log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for match results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON document for scripting
    Json,
    /// reference,candidate rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
