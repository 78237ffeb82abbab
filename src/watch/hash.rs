// src/watch/hash.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Remembers the content hash of the last procedure document handed to the
/// executor, so editor saves that do not change the bytes are ignored.
#[derive(Debug, Default, Clone)]
pub struct ContentTracker {
    last: Option<String>,
}

impl ContentTracker {
    pub fn new(initial: Option<String>) -> Self {
        Self { last: initial }
    }

    /// Seed from the file as it is now; unreadable files start untracked.
    pub fn from_file(path: &Path) -> Self {
        Self::new(compute_file_hash(path).ok())
    }

    pub fn is_changed(&self, hash: &str) -> bool {
        self.last.as_deref() != Some(hash)
    }

    pub fn record(&mut self, hash: String) {
        debug!(hash = %hash, "recorded procedure hash");
        self.last = Some(hash);
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
