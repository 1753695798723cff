//! Configuration types for the importer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Copy files into the project, leaving the card untouched
    #[default]
    Copy,
    /// Move files into the project, removing them from the card
    Move,
}

/// What to do when a destination file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Keep the existing file and leave the source in place
    #[default]
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Abort the import
    Fail,
}

impl ConflictPolicy {
    /// Human readable description used in summaries
    pub fn describe(&self) -> &'static str {
        match self {
            ConflictPolicy::Skip => "keep existing files",
            ConflictPolicy::Overwrite => "overwrite existing files",
            ConflictPolicy::Fail => "abort on existing files",
        }
    }
}

/// Configuration for the importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory to import from (usually a card's DCIM folder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_path: Option<PathBuf>,

    /// Pick the most recently mounted camera volume as import path
    #[serde(default)]
    pub auto_detect: bool,

    /// Project directory that receives the organized files
    pub destination: PathBuf,

    /// File operation mode
    pub operation: FileOperation,

    /// Conflict policy for existing destination files
    #[serde(default)]
    pub on_conflict: ConflictPolicy,

    /// Directories to exclude from scanning (can be absolute paths or folder names)
    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,

    /// Photo extensions, copied unmodified
    pub photo_extensions: Vec<String>,

    /// Full-resolution video extensions, renamed to canonical names
    pub video_extensions: Vec<String>,

    /// Low-resolution video extensions, remuxed into proxies
    pub proxy_source_extensions: Vec<String>,

    /// Extension of generated proxy files
    pub proxy_extension: String,

    /// FFmpeg muxer used for proxy files
    pub proxy_format: String,

    /// Remux program (ffmpeg binary name or path)
    pub remux_program: PathBuf,

    /// Mount roots searched by auto-detection (empty = platform defaults)
    #[serde(default)]
    pub volume_roots: Vec<PathBuf>,

    /// Number of threads for parallel transfers (0 = auto)
    pub threads: usize,

    /// Dry run mode - report planned actions without touching any file
    pub dry_run: bool,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_path: None,
            auto_detect: false,
            destination: PathBuf::from("."),
            operation: FileOperation::default(),
            on_conflict: ConflictPolicy::default(),
            exclude_dirs: vec![],
            photo_extensions: vec!["jpg".into()],
            video_extensions: vec!["mp4".into()],
            proxy_source_extensions: vec!["lrv".into()],
            proxy_extension: "MOV".into(),
            proxy_format: "mov".into(),
            remux_program: PathBuf::from("ffmpeg"),
            volume_roots: vec![],
            threads: 0, // Auto-detect
            dry_run: false,
            verbose: false,
        }
    }
}

/// Kind of media a source file is imported as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Photo,
    Video,
    ProxySource,
}

fn matches_extension(list: &[String], ext: &str) -> bool {
    list.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

impl Config {
    /// Check if a file extension is a photo format
    pub fn is_photo(&self, ext: &str) -> bool {
        matches_extension(&self.photo_extensions, ext)
    }

    /// Check if a file extension is a full-resolution video format
    pub fn is_video(&self, ext: &str) -> bool {
        matches_extension(&self.video_extensions, ext)
    }

    /// Check if a file extension is a low-resolution proxy source
    pub fn is_proxy_source(&self, ext: &str) -> bool {
        matches_extension(&self.proxy_source_extensions, ext)
    }

    /// Classify a file extension
    pub fn classify(&self, ext: &str) -> Option<MediaClass> {
        if self.is_photo(ext) {
            Some(MediaClass::Photo)
        } else if self.is_video(ext) {
            Some(MediaClass::Video)
        } else if self.is_proxy_source(ext) {
            Some(MediaClass::ProxySource)
        } else {
            None
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# gopro-ingest configuration file
# This file uses TOML format (https://toml.io)

# Directory to import from, usually the DCIM folder of a card
import_path = "/media/user/GOPRO/DCIM"

# Use the most recently mounted camera volume instead of import_path
auto_detect = false

# Project directory; proxy/, sources/photos/, sources/videos/ and render/
# are created inside it
destination = "/home/user/Projects/Trip"

# File operation: "copy" or "move"
operation = "copy"

# Existing destination files: "skip", "overwrite" or "fail"
on_conflict = "skip"

# Directories to exclude from scanning
exclude_dirs = [
    "MISC",
    ".Trashes",
]

photo_extensions = ["jpg"]
video_extensions = ["mp4"]
proxy_source_extensions = ["lrv"]

# Proxy container: extension and the matching ffmpeg muxer
proxy_extension = "MOV"
proxy_format = "mov"

# ffmpeg binary name or full path
remux_program = "ffmpeg"

# Mount roots searched by auto-detection (empty = platform defaults)
volume_roots = []

# Number of threads for parallel transfers (0 = auto-detect)
threads = 0

dry_run = false
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let config = Config::default();
        assert_eq!(config.classify("JPG"), Some(MediaClass::Photo));
        assert_eq!(config.classify("jpg"), Some(MediaClass::Photo));
        assert_eq!(config.classify("MP4"), Some(MediaClass::Video));
        assert_eq!(config.classify("LRV"), Some(MediaClass::ProxySource));
        assert_eq!(config.classify("THM"), None);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config.operation, FileOperation::Copy);
        assert_eq!(config.on_conflict, ConflictPolicy::Skip);
        assert_eq!(config.proxy_extension, "MOV");
        assert_eq!(
            config.import_path,
            Some(PathBuf::from("/media/user/GOPRO/DCIM"))
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config").join("trip.toml");

        let config = Config {
            operation: FileOperation::Move,
            on_conflict: ConflictPolicy::Overwrite,
            destination: PathBuf::from("/projects/trip"),
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.operation, FileOperation::Move);
        assert_eq!(loaded.on_conflict, ConflictPolicy::Overwrite);
        assert_eq!(loaded.destination, PathBuf::from("/projects/trip"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from_file("/nonexistent/ingest.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
