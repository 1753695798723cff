//! gopro-ingest - import GoPro cards into video editing projects
//!
//! This library provides functionality for:
//! - Parsing GoPro filenames into chronologically sortable identifiers
//! - Copying photos and renaming full-resolution videos into a project
//! - Remuxing low-resolution videos into proxies with FFmpeg
//! - Linking proxies under the MD5 fingerprint of their masters
//! - Auto-detecting the most recently mounted camera volume

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod identifier;
pub mod import;
pub mod layout;
pub mod os;
pub mod proxy;
pub mod remux;
pub mod transfer;

pub use cli::Cli;
pub use config::{Config, ConfigError, ConflictPolicy, FileOperation};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, fingerprint};
pub use identifier::{MediaIdentifier, ParseError, VideoKind};
pub use import::{FileResult, FileStatus, ImportSummary, Importer, Phase};
pub use layout::ProjectLayout;
pub use proxy::{FullResVideoRecord, find_counterpart};
pub use remux::{FfmpegRemuxer, Remuxer};
