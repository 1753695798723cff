//! End-to-end imports of a fake camera card

use gopro_ingest::{
    Config, ConflictPolicy, Error, FileOperation, FileStatus, Importer, Remuxer, fingerprint,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stands in for ffmpeg: the proxy is a plain copy of the preview file
struct CopyRemuxer;

impl Remuxer for CopyRemuxer {
    fn ensure_available(&self) -> gopro_ingest::Result<()> {
        Ok(())
    }

    fn remux(&self, source: &Path, dest: &Path, _format: &str) -> gopro_ingest::Result<()> {
        fs::copy(source, dest)?;
        Ok(())
    }
}

struct Card {
    _dir: TempDir,
    card: PathBuf,
    project: PathBuf,
}

fn card() -> Card {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("GOPRO").join("DCIM").join("100GOPRO");
    fs::create_dir_all(&card).unwrap();

    // Master larger than the sampling threshold
    let master: Vec<u8> = (0..2_500_000u32).map(|i| (i % 241) as u8).collect();
    fs::write(card.join("GH010042.MP4"), master).unwrap();
    fs::write(card.join("GL010042.LRV"), b"low resolution preview").unwrap();
    fs::write(card.join("GOPR0042.JPG"), b"jpeg data").unwrap();

    Card {
        project: dir.path().join("project"),
        card: dir.path().join("GOPRO").join("DCIM"),
        _dir: dir,
    }
}

fn config(card: &Card) -> Config {
    Config {
        import_path: Some(card.card.clone()),
        destination: card.project.clone(),
        threads: 2,
        ..Config::default()
    }
}

fn import(config: Config) -> gopro_ingest::Result<gopro_ingest::ImportSummary> {
    Importer::new(config, Box::new(CopyRemuxer))?.run()
}

/// Every path below `root`, relative to it
fn tree(root: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

#[test]
fn imports_photo_video_and_proxy() {
    let card = card();
    let summary = import(config(&card)).unwrap();

    assert_eq!(summary.photos, 1);
    assert_eq!(summary.videos, 1);
    assert_eq!(summary.proxies, 1);
    assert_eq!(summary.skipped, 0);

    let project = &card.project;
    assert_eq!(
        fs::read(project.join("sources/photos/GOPR0042.JPG")).unwrap(),
        b"jpeg data"
    );
    let master = project.join("sources/videos/G0042_01_H.MP4");
    assert!(master.is_file());
    assert_eq!(
        fs::read(project.join("proxy/G0042_01_L.MOV")).unwrap(),
        b"low resolution preview"
    );
    assert!(project.join("render").is_dir());

    let alias = project
        .join("proxy")
        .join(fingerprint(&master).unwrap().file_name("MOV"));
    assert_eq!(
        fs::read(&alias).unwrap(),
        b"low resolution preview",
        "alias must resolve to the proxy"
    );

    #[cfg(unix)]
    assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("G0042_01_L.MOV"));

    // Copy mode leaves the card untouched
    assert!(card.card.join("100GOPRO/GH010042.MP4").exists());
    assert!(card.card.join("100GOPRO/GL010042.LRV").exists());
}

#[test]
fn second_copy_run_changes_nothing() {
    let card = card();
    import(config(&card)).unwrap();
    let before = tree(&card.project);

    let summary = import(config(&card)).unwrap();
    assert_eq!(summary.photos + summary.videos + summary.proxies, 0);
    assert_eq!(summary.unchanged, 3);
    assert_eq!(summary.with_status(FileStatus::AlreadyPresent).count(), 3);

    assert_eq!(tree(&card.project), before);
}

#[test]
fn overwrite_policy_replaces_files() {
    let card = card();
    import(config(&card)).unwrap();
    fs::write(card.project.join("sources/photos/GOPR0042.JPG"), b"edited").unwrap();

    let mut cfg = config(&card);
    cfg.on_conflict = ConflictPolicy::Overwrite;
    let summary = import(cfg).unwrap();

    assert_eq!(summary.photos, 1);
    assert_eq!(summary.videos, 1);
    assert_eq!(summary.proxies, 1);
    assert_eq!(
        fs::read(card.project.join("sources/photos/GOPR0042.JPG")).unwrap(),
        b"jpeg data"
    );
}

#[test]
fn fail_policy_aborts_on_existing_files() {
    let card = card();
    import(config(&card)).unwrap();

    let mut cfg = config(&card);
    cfg.on_conflict = ConflictPolicy::Fail;
    let err = import(cfg).unwrap_err();
    assert!(matches!(err, Error::DestinationExists { .. }));
}

#[test]
fn move_mode_empties_the_card() {
    let card = card();
    let mut cfg = config(&card);
    cfg.operation = FileOperation::Move;
    let summary = import(cfg).unwrap();

    assert_eq!(summary.proxies, 1);
    let remaining: Vec<_> = tree(&card.card)
        .into_iter()
        .filter(|p| card.card.join(p).is_file())
        .collect();
    assert!(remaining.is_empty(), "left on card: {remaining:?}");
    assert!(card.project.join("sources/videos/G0042_01_H.MP4").is_file());
}

#[test]
fn proxies_match_masters_of_earlier_imports() {
    let card = card();
    import(config(&card)).unwrap();

    // A later card holds only the preview of an already imported master
    let later = tempfile::tempdir().unwrap();
    fs::write(later.path().join("GL010042.LRV"), b"new preview").unwrap();
    fs::remove_file(card.project.join("proxy/G0042_01_L.MOV")).unwrap();

    let cfg = Config {
        import_path: Some(later.path().to_path_buf()),
        destination: card.project.clone(),
        ..Config::default()
    };
    let summary = import(cfg).unwrap();

    assert_eq!(summary.proxies, 1);
    assert_eq!(
        fs::read(card.project.join("proxy/G0042_01_L.MOV")).unwrap(),
        b"new preview"
    );
}
