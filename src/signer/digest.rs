//! BLAKE3 file digests with streaming reads.
//!
//! # Overview
//! [`ExactDigestSigner`] streams a file through BLAKE3 in [`CHUNK_SIZE`]
//! chunks, so memory use stays flat regardless of file size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{ContentSignature, ContentSigner, SignatureError};

/// A 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

/// Read size used when streaming file contents.
pub const CHUNK_SIZE: usize = 4096;

/// Computes byte-exact content digests.
#[derive(Debug, Clone, Default)]
pub struct ExactDigestSigner {
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ExactDigestSigner {
    /// Create a new digest signer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown flag; hashing stops between chunks once it is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Digest the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Io`] if the file cannot be opened or read,
    /// and [`SignatureError::Interrupted`] if shutdown was requested.
    pub fn digest(&self, path: &Path) -> Result<Digest, SignatureError> {
        let io_err = |source: std::io::Error| SignatureError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(SignatureError::Interrupted);
            }

            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

impl ContentSigner for ExactDigestSigner {
    fn sign(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
        log::trace!("Digesting {}", path.display());
        self.digest(path).map(ContentSignature::Exact)
    }
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(digest: &Digest) -> String {
    blake3::Hash::from(*digest).to_hex().to_string()
}
