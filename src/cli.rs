//! CLI argument parsing with clap

use crate::config::{Config, ConflictPolicy, FileOperation};
use clap::Parser;
use std::path::PathBuf;

/// gopro-ingest - Import GoPro media into a video editing project
///
/// Copies photos, renames videos so they sort chronologically
/// (GH010042.MP4 -> G0042_01_H.MP4) and turns LRV preview files into
/// proxies the editing application picks up automatically.
#[derive(Parser, Debug)]
#[command(name = "gopro-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to import from (e.g. the card's DCIM folder)
    #[arg(required_unless_present_any = ["auto", "config", "sample_config"])]
    pub import_path: Option<PathBuf>,

    /// Import from the most recently mounted camera volume
    #[arg(short, long, conflicts_with = "import_path")]
    pub auto: bool,

    /// Move files instead of copying them
    #[arg(short = 'm', long = "move")]
    pub move_files: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings to a TOML file before importing
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Print an annotated sample configuration file and exit
    #[arg(long, conflicts_with_all = ["import_path", "auto", "config"])]
    pub sample_config: bool,

    /// What to do with files that already exist in the project
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictPolicy>,

    /// Number of threads for parallel transfers (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Print the import summary as JSON instead of text
    #[arg(long)]
    pub json_summary: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref import_path) = self.import_path {
            config.import_path = Some(import_path.clone());
            config.auto_detect = false;
        }
        if self.auto {
            config.auto_detect = true;
        }
        if self.move_files {
            config.operation = FileOperation::Move;
        }
        if let Some(ref destination) = self.destination {
            config.destination = destination.clone();
        }
        if let Some(on_conflict) = self.on_conflict {
            config.on_conflict = on_conflict;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
