//! MD5-based proxy fingerprinting
//!
//! The editing application recognizes a proxy by a file named after the
//! fingerprint of its full-resolution master. For files up to 2 MB the
//! fingerprint is the MD5 of the whole file. For larger files only the
//! first and last megabyte are hashed, in that order.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

/// Files larger than this use sampled hashing
pub const SAMPLING_THRESHOLD: u64 = 2_000_000;

/// Size of the head and tail samples
const SAMPLE_SIZE: u64 = 1_000_000;

/// Lowercase hex MD5 digest of a media file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Alias file name for a proxy with the given extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the proxy fingerprint of a file
pub fn fingerprint(path: &Path) -> Result<Fingerprint> {
    // Stat first: a missing file must fail here, not inside a read.
    let metadata = std::fs::metadata(path).map_err(|e| Error::Fingerprint {
        path: path.to_path_buf(),
        message: format!("Cannot stat file: {}", e),
    })?;

    if !metadata.is_file() {
        return Err(Error::Fingerprint {
            path: path.to_path_buf(),
            message: "Not a regular file".into(),
        });
    }

    let file_size = metadata.len();
    let digest = if file_size > SAMPLING_THRESHOLD {
        sampled_digest(path, file_size)?
    } else {
        full_digest(path)?
    };

    let fingerprint = Fingerprint(digest);
    trace!(?path, file_size, %fingerprint, "Computed proxy fingerprint");
    Ok(fingerprint)
}

/// MD5 of the whole file
fn full_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| Error::Fingerprint {
            path: path.to_path_buf(),
            message: format!("Failed to read file: {}", e),
        })?;

    Ok(hex::encode(Md5::digest(&buffer)))
}

/// MD5 of the first and last megabyte
fn sampled_digest(path: &Path, file_size: u64) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; SAMPLE_SIZE as usize];

    file.read_exact(&mut buffer)
        .map_err(|e| Error::Fingerprint {
            path: path.to_path_buf(),
            message: format!("Failed to read file head: {}", e),
        })?;
    hasher.update(&buffer);

    file.seek(SeekFrom::Start(file_size - SAMPLE_SIZE))
        .map_err(|e| Error::Fingerprint {
            path: path.to_path_buf(),
            message: format!("Failed to seek to tail: {}", e),
        })?;
    file.read_exact(&mut buffer)
        .map_err(|e| Error::Fingerprint {
            path: path.to_path_buf(),
            message: format!("Failed to read file tail: {}", e),
        })?;
    hasher.update(&buffer);

    Ok(hex::encode(hasher.finalize()))
}
