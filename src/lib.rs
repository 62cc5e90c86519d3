//! refmatch - Reference/Candidate File Matcher
//!
//! Finds which files under a candidates directory correspond to files under a
//! reference directory. Files are paired by size first (exact, or within 1%),
//! then confirmed by content: a BLAKE3 digest, or a perceptual signature for
//! video files when video mode is enabled.

pub mod cli;
pub mod error;
pub mod logging;
pub mod matching;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod signer;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::Cli;
use crate::error::ExitCode;
use crate::matching::{FileMatcher, MatcherConfig, MatcherError, SizePredicate};
use crate::progress::Progress;
use crate::scanner::WalkerConfig;
use crate::signer::VideoTools;

/// Build the pipeline configuration from parsed arguments.
#[must_use]
pub fn matcher_config(cli: &Cli) -> MatcherConfig {
    let size_predicate = if cli.approximate {
        SizePredicate::approximate()
    } else {
        SizePredicate::Exact
    };

    MatcherConfig::default()
        .with_walker_config(WalkerConfig::new(cli.follow_symlinks, cli.skip_hidden))
        .with_size_predicate(size_predicate)
        .with_video_mode(cli.videos)
        .with_video_threshold(cli.video_threshold)
        .with_video_tools(VideoTools {
            ffmpeg: cli.ffmpeg.clone(),
            ffprobe: cli.ffprobe.clone(),
        })
        .with_io_threads(usize::from(cli.io_threads))
}

/// Run the application for parsed arguments and return the exit code.
///
/// The report is written to stdout only after the whole run succeeded.
///
/// # Errors
///
/// Returns an error for invalid directories, an interrupted run
/// ([`MatcherError::Interrupted`]), or a failure writing the report.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    log::debug!("Parsed arguments: {:?}", cli);

    let handler = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let mut config = matcher_config(&cli).with_shutdown_flag(handler.get_flag());
    if !cli.quiet {
        config = config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let matcher = FileMatcher::new(config);
    let (report, summary) = matcher
        .run(&cli.reference_dir, &cli.candidates_dir)
        .map_err(|e| match e {
            MatcherError::Interrupted => anyhow::Error::new(e),
            other => anyhow::Error::new(other).context("Matching failed"),
        })?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::render(&report, &summary, cli.output, &mut handle)
        .context("Failed to write report")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(ExitCode::Success)
}
