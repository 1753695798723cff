//! gopro-ingest - Import GoPro media into a video editing project
//!
//! Copies photos, renames full-resolution videos chronologically and links
//! low-resolution previews as proxies of their masters.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use gopro_ingest::{Cli, Config, FfmpegRemuxer, FileStatus, ImportSummary, Importer};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal.

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(format!("{}{}\n", left_pad, title.bold())));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: usize, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value.to_string()).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one processed file
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not usage errors
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return;
    }

    let code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<gopro_ingest::Error>()
                .map(gopro_ingest::Error::exit_code)
                .unwrap_or(1)
        }
    };

    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, cli);
    let _guard = setup_logging(cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "gopro-ingest starting");

    let config = load_config(cli, &exe_dir)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let remuxer = FfmpegRemuxer::new(config.remux_program.clone());
    let mut importer = Importer::new(config.clone(), Box::new(remuxer))?;

    match importer.run() {
        Ok(summary) => {
            if cli.json_summary {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary, &config, &log_path);
            }
            info!(log_file = %log_path.display(), "Import complete. Log saved to");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, phase = ?importer.phase(), "Import failed");
            Err(e.into())
        }
    }
}

fn print_summary(summary: &ImportSummary, config: &Config, log_path: &Path) {
    use cli_output::*;

    print_separator();
    print_title("Import complete");
    print_separator();

    print_blank();
    print_key_value("Source", &summary.import_path.display().to_string());
    print_key_value("Project", &summary.destination.display().to_string());
    print_key_value("Conflicts", config.on_conflict.describe());
    print_blank();
    print_stat("Photos", summary.photos, CliTheme::SUCCESS);
    print_stat("Videos", summary.videos, CliTheme::SUCCESS);
    print_stat("Proxies", summary.proxies, CliTheme::SUCCESS);
    print_stat("Unchanged", summary.unchanged, CliTheme::ACCENT);
    print_stat("Skipped", summary.skipped, CliTheme::WARNING);
    print_blank();

    if config.verbose {
        print_separator();
        for result in &summary.results {
            let source = result.source.display().to_string();
            let dest = result
                .destination
                .as_ref()
                .map(|p| format!("→ {}", p.display()))
                .unwrap_or_default();
            match result.status {
                FileStatus::Transferred | FileStatus::Linked => {
                    print_result("✓", CliTheme::SUCCESS, &source, &dest)
                }
                FileStatus::AlreadyPresent => print_result("=", CliTheme::ACCENT, &source, &dest),
                FileStatus::DryRun => print_result("~", CliTheme::ACCENT, &source, &dest),
                FileStatus::Skipped => {}
            }
        }
    }

    let skipped: Vec<_> = summary.with_status(FileStatus::Skipped).collect();
    if !skipped.is_empty() {
        print_separator();
        print_warning(&format!("{} files skipped", skipped.len()));
        print_blank();
        for result in skipped {
            print_result(
                "⊘",
                CliTheme::WARNING,
                &result.source.display().to_string(),
                result.message.as_deref().unwrap_or_default(),
            );
        }
    }

    if summary.dry_run {
        print_separator();
        print_warning("Dry run - no files were changed");
    }

    print_separator();
    print_log_path(&log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("Import_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax (`-C trip` finds
/// `trip.toml` here or in `<exe dir>/Config/`)
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments, resolving auto-detection
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let mut config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path).map_err(gopro_ingest::Error::from)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if let Some(ref save_path) = cli.save_config {
        config
            .save_to_file(save_path)
            .map_err(gopro_ingest::Error::from)?;
        info!(config_file = %save_path.display(), "Configuration saved");
    }

    if config.auto_detect {
        let volume = gopro_ingest::os::latest_volume(&config.volume_roots).ok_or_else(|| {
            gopro_ingest::Error::Validation("no mounted camera volume with a DCIM folder".into())
        })?;
        info!(import_path = %volume.display(), "Auto-detected camera volume");
        config.import_path = Some(volume);
    }

    if config.import_path.is_none() {
        return Err(gopro_ingest::Error::Validation("no import path given".into()).into());
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
