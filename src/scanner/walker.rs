//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for enumerating every regular
//! file below a root directory as an absolute path. It uses [`jwalk`] for
//! parallel directory reading while keeping output order deterministic.
//!
//! # Features
//!
//! - Root validation: a missing root or a non-directory root is a hard error
//! - Absolute output paths (the root is canonicalized before walking)
//! - Deterministic ordering (children sorted by file name)
//! - Optional symlink following with jwalk's loop detection
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use refmatch::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! for entry in walker.walk().expect("valid root") {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{ScanError, WalkerConfig};

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk, as given by the caller
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker will stop iteration
    /// as soon as possible.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Validate the root and resolve it to an absolute, canonical path.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NotFound`] if the root does not exist
    /// - [`ScanError::NotADirectory`] if the root is not a directory
    pub fn resolve_root(&self) -> Result<PathBuf, ScanError> {
        let canonical = std::fs::canonicalize(&self.root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(self.root.clone()),
            _ => ScanError::from_io(&self.root, e),
        })?;

        if !canonical.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        Ok(canonical)
    }

    /// Walk the directory tree, yielding absolute paths of regular files.
    ///
    /// Errors for individual entries are yielded as [`ScanError`] values
    /// rather than stopping iteration.
    ///
    /// # Errors
    ///
    /// Fails up front if the root is missing or not a directory.
    pub fn walk(
        &self,
    ) -> Result<impl Iterator<Item = Result<PathBuf, ScanError>> + '_, ScanError> {
        let root = self.resolve_root()?;
        log::debug!("Walking {}", root.display());

        let walk_dir = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(|_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        Ok(walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if path == root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    if !file_type.is_file() && !file_type.is_symlink() {
                        log::trace!("Skipping special file: {}", path.display());
                        return None;
                    }

                    Some(Ok(path))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| root.clone(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            }
        }))
    }

    /// Collect every file below the root, logging and skipping entry errors.
    ///
    /// # Errors
    ///
    /// Fails only when the root itself is invalid.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();
        for entry in self.walk()? {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => log::debug!("Skipping unreadable entry: {}", e),
            }
        }
        Ok(files)
    }
}
