//! Error types for the importer

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for importer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the importer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid import setup: {0}")]
    Validation(String),

    #[error("Fingerprint computation failed for {path}: {message}")]
    Fingerprint { path: PathBuf, message: String },

    #[error("Remux of {path} failed: {message}")]
    Remux { path: PathBuf, message: String },

    #[error("{program} not found. Please install FFmpeg and ensure it is in PATH")]
    RemuxerNotFound { program: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl Error {
    /// Process exit code reported by the binary for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::RemuxerNotFound { .. } => 255,
            Error::Remux { .. } => 2,
            _ => 1,
        }
    }
}
