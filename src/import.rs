//! Import orchestration
//!
//! An import runs through fixed phases:
//! - Prepare: validate paths, scan the card, check the remux tool, create
//!   the project layout
//! - Photos: copy or move photos unmodified
//! - Videos: rename full-resolution videos to their canonical names
//! - Proxies: remux low-resolution videos and link them to their masters
//!
//! Proxies are matched against the videos directory, so the Videos phase
//! must be complete before the Proxies phase starts. Photos and videos are
//! transferred in parallel within their phase; proxies are handled one at a
//! time and the first remux failure aborts the run.

use crate::config::{Config, ConflictPolicy, FileOperation, MediaClass};
use crate::error::{Error, Result};
use crate::fingerprint::fingerprint;
use crate::identifier::{MediaIdentifier, VideoKind};
use crate::layout::ProjectLayout;
use crate::proxy::{FullResVideoRecord, LinkOutcome, find_counterpart, link_proxy};
use crate::remux::Remuxer;
use crate::transfer::{
    DestinationAction, TransferOutcome, resolve_conflict, transfer, write_atomically,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Import phase, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prepare,
    Photos,
    Videos,
    Proxies,
    Done,
}

impl Phase {
    /// The phase that follows this one
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Prepare => Some(Phase::Photos),
            Phase::Photos => Some(Phase::Videos),
            Phase::Videos => Some(Phase::Proxies),
            Phase::Proxies => Some(Phase::Done),
            Phase::Done => None,
        }
    }
}

/// A media file discovered on the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFile {
    pub path: PathBuf,
    pub extension: String,
    pub raw_name: String,
}

impl CameraFile {
    pub fn from_path(path: &Path) -> Option<Self> {
        let raw_name = path.file_name()?.to_str()?.to_string();
        let extension = path.extension()?.to_str()?.to_string();
        Some(Self {
            path: path.to_path_buf(),
            extension,
            raw_name,
        })
    }
}

/// Files found on the card, grouped by how they are imported
#[derive(Debug, Default)]
pub struct Inventory {
    pub photos: Vec<CameraFile>,
    pub videos: Vec<CameraFile>,
    pub proxy_sources: Vec<CameraFile>,
}

impl Inventory {
    fn len(&self) -> usize {
        self.photos.len() + self.videos.len() + self.proxy_sources.len()
    }
}

/// Status of a single file after import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// Copied or moved into the project
    Transferred,
    /// Proxy created and linked to its master
    Linked,
    /// Destination already existed and was kept
    AlreadyPresent,
    /// Not imported (unparseable name or no matching master)
    Skipped,
    /// Dry run - would have been imported
    DryRun,
}

/// Result of importing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub phase: Phase,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub status: FileStatus,
    /// Reason for a skip
    pub message: Option<String>,
}

/// Import statistics
#[derive(Debug, Default)]
pub struct ImportStats {
    pub photos: AtomicUsize,
    pub videos: AtomicUsize,
    pub proxies: AtomicUsize,
    pub unchanged: AtomicUsize,
    pub skipped: AtomicUsize,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, phase: Phase, status: FileStatus) {
        let counter = match (phase, status) {
            (_, FileStatus::AlreadyPresent) => &self.unchanged,
            (_, FileStatus::Skipped) => &self.skipped,
            (Phase::Photos, _) => &self.photos,
            (Phase::Videos, _) => &self.videos,
            (Phase::Proxies, _) => &self.proxies,
            (Phase::Prepare | Phase::Done, _) => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> String {
        format!(
            "Photos: {}, Videos: {}, Proxies: {}, Unchanged: {}, Skipped: {}",
            self.photos.load(Ordering::Relaxed),
            self.videos.load(Ordering::Relaxed),
            self.proxies.load(Ordering::Relaxed),
            self.unchanged.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        )
    }
}

/// Outcome of a complete import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub import_path: PathBuf,
    pub destination: PathBuf,
    pub dry_run: bool,
    pub photos: usize,
    pub videos: usize,
    pub proxies: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub results: Vec<FileResult>,
}

impl ImportSummary {
    /// Results with the given status
    pub fn with_status(&self, status: FileStatus) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(move |r| r.status == status)
    }
}

/// Imports one camera card into one project directory
pub struct Importer {
    config: Config,
    import_path: PathBuf,
    layout: ProjectLayout,
    remuxer: Box<dyn Remuxer>,
    pool: rayon::ThreadPool,
    phase: Phase,
    stats: ImportStats,
    /// Dry run only: canonical video name -> source file
    planned_videos: HashMap<String, PathBuf>,
}

impl Importer {
    /// Create an importer; `config.import_path` must be resolved already
    pub fn new(config: Config, remuxer: Box<dyn Remuxer>) -> Result<Self> {
        let import_path = config
            .import_path
            .clone()
            .ok_or_else(|| Error::Validation("no import path given".into()))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| Error::Validation(format!("cannot start worker threads: {}", e)))?;

        Ok(Self {
            layout: ProjectLayout::new(config.destination.clone()),
            import_path,
            config,
            remuxer,
            pool,
            phase: Phase::Prepare,
            stats: ImportStats::new(),
            planned_videos: HashMap::new(),
        })
    }

    /// Current phase; after a failed run, the phase that failed
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run all phases in order
    pub fn run(&mut self) -> Result<ImportSummary> {
        if self.phase != Phase::Prepare {
            return Err(Error::Validation("an importer runs only once".into()));
        }

        let _span = span!(Level::INFO, "import", source = ?self.import_path).entered();
        let mut inventory = Inventory::default();
        let mut results = Vec::new();

        while self.phase != Phase::Done {
            let _phase_span = span!(Level::INFO, "phase", phase = ?self.phase).entered();

            match self.phase {
                Phase::Prepare => inventory = self.prepare()?,
                Phase::Photos => results.extend(self.import_photos(&inventory.photos)?),
                Phase::Videos => results.extend(self.import_videos(&inventory.videos)?),
                Phase::Proxies => results.extend(self.import_proxies(&inventory.proxy_sources)?),
                Phase::Done => {}
            }

            self.phase = self.phase.next().unwrap_or(Phase::Done);
        }

        info!("{}", self.stats.summary());

        Ok(ImportSummary {
            import_path: self.import_path.clone(),
            destination: self.layout.root().to_path_buf(),
            dry_run: self.config.dry_run,
            photos: self.stats.photos.load(Ordering::Relaxed),
            videos: self.stats.videos.load(Ordering::Relaxed),
            proxies: self.stats.proxies.load(Ordering::Relaxed),
            unchanged: self.stats.unchanged.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            results,
        })
    }

    /// Validate, scan and create the layout; nothing is mutated before the
    /// checks pass
    fn prepare(&self) -> Result<Inventory> {
        self.validate()?;

        info!("Scanning import path...");
        let inventory = self.scan()?;
        info!(
            photos = inventory.photos.len(),
            videos = inventory.videos.len(),
            proxies = inventory.proxy_sources.len(),
            total = inventory.len(),
            "Found media files"
        );

        if !inventory.proxy_sources.is_empty() && !self.config.dry_run {
            self.remuxer.ensure_available()?;
        }

        if !self.config.dry_run {
            self.layout.ensure()?;
        }

        Ok(inventory)
    }

    fn validate(&self) -> Result<()> {
        if !self.import_path.is_dir() {
            return Err(Error::Validation(format!(
                "import path {} is not a directory",
                self.import_path.display()
            )));
        }

        let root = self.layout.root();
        if root.exists() && !root.is_dir() {
            return Err(Error::Validation(format!(
                "destination {} is not a directory",
                root.display()
            )));
        }

        let import_path = fs::canonicalize(&self.import_path)?;
        let destination = resolve_path(root)?;
        if destination.starts_with(&import_path) {
            return Err(Error::Validation(format!(
                "destination {} is inside import path {}",
                destination.display(),
                import_path.display()
            )));
        }

        Ok(())
    }

    /// Collect media files under the import path, sorted by path
    pub fn scan(&self) -> Result<Inventory> {
        let mut inventory = Inventory::default();

        for entry in WalkDir::new(&self.import_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded_dir(e.path()))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file) = CameraFile::from_path(entry.path()) else {
                debug!(path = ?entry.path(), "Ignoring file without extension");
                continue;
            };

            match self.config.classify(&file.extension) {
                Some(MediaClass::Photo) => inventory.photos.push(file),
                Some(MediaClass::Video) => inventory.videos.push(file),
                Some(MediaClass::ProxySource) => inventory.proxy_sources.push(file),
                None => debug!(path = ?file.path, "Ignoring unsupported file"),
            }
        }

        Ok(inventory)
    }

    /// Check if a path should be excluded based on exclude_dirs configuration
    fn is_excluded_dir(&self, path: &Path) -> bool {
        self.config.exclude_dirs.iter().any(|exclude| {
            if exclude.is_absolute() {
                path.starts_with(exclude)
            } else {
                exclude.file_name().is_some_and(|exclude_name| {
                    path.components().any(|component| {
                        matches!(component, std::path::Component::Normal(name) if name == exclude_name)
                    })
                })
            }
        })
    }

    fn import_photos(&self, photos: &[CameraFile]) -> Result<Vec<FileResult>> {
        info!(count = photos.len(), "Importing photos...");
        let dir = self.layout.photos_dir();

        let planned = photos
            .iter()
            .map(|file| (file, dir.join(&file.raw_name)))
            .collect();
        self.transfer_all(Phase::Photos, planned)
    }

    fn import_videos(&mut self, videos: &[CameraFile]) -> Result<Vec<FileResult>> {
        info!(count = videos.len(), "Importing videos...");
        let dir = self.layout.videos_dir();

        let mut results = Vec::new();
        let mut planned = Vec::with_capacity(videos.len());
        for file in videos {
            match MediaIdentifier::from_path(&file.path) {
                Ok(identifier) => {
                    let dest = dir.join(identifier.file_name(&file.extension.to_uppercase()));
                    planned.push((file, dest));
                }
                Err(e) => results.push(self.skipped(Phase::Videos, file, e.to_string())),
            }
        }
        results.extend(self.transfer_all(Phase::Videos, planned)?);

        if self.config.dry_run {
            for result in results.iter().filter(|r| r.status == FileStatus::DryRun) {
                if let Some(name) = result
                    .destination
                    .as_ref()
                    .and_then(|d| d.file_name())
                    .and_then(|n| n.to_str())
                {
                    self.planned_videos
                        .insert(name.to_string(), result.source.clone());
                }
            }
        }

        Ok(results)
    }

    /// Transfer files to their destinations, in parallel across distinct
    /// destinations
    ///
    /// The first file claiming a destination is transferred on the pool.
    /// Later files with the same destination are handled afterwards, one at a
    /// time, so the conflict policy sees the file written by the first.
    fn transfer_all(
        &self,
        phase: Phase,
        planned: Vec<(&CameraFile, PathBuf)>,
    ) -> Result<Vec<FileResult>> {
        let mut claimed = HashSet::new();
        let (first, duplicates): (Vec<_>, Vec<_>) = planned
            .into_iter()
            .partition(|(_, dest)| claimed.insert(dest.clone()));

        let mut results: Vec<FileResult> = self.pool.install(|| {
            first
                .par_iter()
                .map(|(file, dest)| -> Result<FileResult> {
                    let outcome = self.transfer(&file.path, dest)?;
                    Ok(self.transferred(phase, file, dest.clone(), outcome))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        for (file, dest) in duplicates {
            debug!(source = ?file.path, destination = ?dest, "Destination shared with another file");
            let outcome = if self.config.dry_run {
                // Nothing was written, but the first file would have been
                match self.config.on_conflict {
                    ConflictPolicy::Skip => TransferOutcome::AlreadyPresent,
                    ConflictPolicy::Overwrite => TransferOutcome::Planned,
                    ConflictPolicy::Fail => return Err(Error::DestinationExists { path: dest }),
                }
            } else {
                self.transfer(&file.path, &dest)?
            };
            results.push(self.transferred(phase, file, dest, outcome));
        }

        Ok(results)
    }

    fn import_proxies(&self, proxy_sources: &[CameraFile]) -> Result<Vec<FileResult>> {
        info!(count = proxy_sources.len(), "Importing proxies...");
        proxy_sources
            .iter()
            .map(|file| self.import_proxy(file))
            .collect()
    }

    fn import_proxy(&self, file: &CameraFile) -> Result<FileResult> {
        let identifier = match MediaIdentifier::from_path(&file.path) {
            Ok(id) => id,
            Err(e) => return Ok(self.skipped(Phase::Proxies, file, e.to_string())),
        };

        let Some(master) = self.find_master(&identifier) else {
            let message = format!(
                "no full-resolution video {}_H/X in {}",
                identifier.base_name(),
                self.layout.videos_dir().display()
            );
            return Ok(self.skipped(Phase::Proxies, file, message));
        };
        debug!(proxy = ?file.path, master = ?master.path, "Matched proxy");

        let proxy_file = self
            .layout
            .proxy_dir()
            .join(identifier.file_name(&self.config.proxy_extension));

        let remuxed = match resolve_conflict(&proxy_file, self.config.on_conflict)? {
            DestinationAction::Keep => false,
            DestinationAction::Write if self.config.dry_run => false,
            DestinationAction::Write => {
                write_atomically(&proxy_file, |partial| {
                    self.remuxer
                        .remux(&file.path, partial, &self.config.proxy_format)
                })?;
                if self.config.operation == FileOperation::Move {
                    fs::remove_file(&file.path)?;
                }
                true
            }
        };

        let fingerprint = fingerprint(&master.path)?;
        let link = link_proxy(
            &fingerprint,
            &proxy_file,
            &self.config.proxy_extension,
            self.config.on_conflict,
            self.config.dry_run,
        )?;

        let status = if self.config.dry_run {
            FileStatus::DryRun
        } else if remuxed || link == LinkOutcome::Created {
            FileStatus::Linked
        } else {
            FileStatus::AlreadyPresent
        };

        info!(
            source = ?file.path,
            destination = ?proxy_file,
            %fingerprint,
            ?status,
            "Proxy"
        );
        Ok(self.record(Phase::Proxies, file, Some(proxy_file), status, None))
    }

    /// Relocated master of a proxy; during a dry run the planned master's
    /// source stands in for it
    fn find_master(&self, identifier: &MediaIdentifier) -> Option<FullResVideoRecord> {
        let videos_dir = self.layout.videos_dir();

        for extension in &self.config.video_extensions {
            let extension = extension.to_uppercase();
            if let Some(record) = find_counterpart(identifier, &videos_dir, &extension) {
                return Some(record);
            }

            if self.config.dry_run {
                for kind in [VideoKind::H, VideoKind::X] {
                    let master = identifier.with_kind(kind);
                    if let Some(source) = self.planned_videos.get(&master.file_name(&extension)) {
                        return Some(FullResVideoRecord {
                            identifier: master,
                            path: source.clone(),
                        });
                    }
                }
            }
        }

        None
    }

    fn transfer(&self, source: &Path, dest: &Path) -> Result<TransferOutcome> {
        transfer(
            source,
            dest,
            self.config.operation,
            self.config.on_conflict,
            self.config.dry_run,
        )
    }

    fn transferred(
        &self,
        phase: Phase,
        file: &CameraFile,
        dest: PathBuf,
        outcome: TransferOutcome,
    ) -> FileResult {
        let status = match outcome {
            TransferOutcome::Transferred => FileStatus::Transferred,
            TransferOutcome::AlreadyPresent => FileStatus::AlreadyPresent,
            TransferOutcome::Planned => FileStatus::DryRun,
        };

        info!(source = ?file.path, destination = ?dest, ?status, "{:?}", phase);
        self.record(phase, file, Some(dest), status, None)
    }

    fn skipped(&self, phase: Phase, file: &CameraFile, message: String) -> FileResult {
        warn!(source = ?file.path, reason = %message, "Skipping file");
        self.record(phase, file, None, FileStatus::Skipped, Some(message))
    }

    fn record(
        &self,
        phase: Phase,
        file: &CameraFile,
        destination: Option<PathBuf>,
        status: FileStatus,
        message: Option<String>,
    ) -> FileResult {
        self.stats.record(phase, status);
        FileResult {
            phase,
            source: file.path.clone(),
            destination,
            status,
            message,
        }
    }
}

/// Canonical form of a path that may not exist yet
fn resolve_path(path: &Path) -> Result<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(path) {
        return Ok(resolved);
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            Ok(resolve_path(parent)?.join(name))
        }
        _ => Ok(std::path::absolute(path)?),
    }
}
