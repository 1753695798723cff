//! Platform-specific volume discovery.
//!
//! Camera cards show up as removable volumes with a `DCIM` folder at their
//! root. Auto-detection picks the most recently mounted one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

/// Folder every camera card carries at its root
pub const CAMERA_ROOT: &str = "DCIM";

/// Directories under which removable volumes get mounted.
#[cfg(unix)]
pub fn candidate_volume_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::getuid()) {
        roots.push(PathBuf::from("/media").join(&user.name));
        roots.push(PathBuf::from("/run/media").join(&user.name));
    }
    roots.push(PathBuf::from("/media"));
    roots.push(PathBuf::from("/Volumes"));

    roots
}

/// Directories under which removable volumes get mounted.
#[cfg(windows)]
pub fn candidate_volume_roots() -> Vec<PathBuf> {
    // C: is never a camera card
    ('D'..='Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter)))
        .collect()
}

/// Volumes that look like camera cards: `root` itself or its children.
fn volumes_under(root: &Path) -> Vec<PathBuf> {
    if root.join(CAMERA_ROOT).is_dir() {
        return vec![root.to_path_buf()];
    }

    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(CAMERA_ROOT).is_dir())
        .collect()
}

/// `DCIM` folder of the most recently mounted camera volume.
///
/// With no roots given, the platform defaults are searched.
pub fn latest_volume(roots: &[PathBuf]) -> Option<PathBuf> {
    let roots = if roots.is_empty() {
        candidate_volume_roots()
    } else {
        roots.to_vec()
    };

    let mut volumes: Vec<PathBuf> = roots.iter().flat_map(|r| volumes_under(r)).collect();
    volumes.sort();
    volumes.dedup();

    let latest = volumes
        .into_iter()
        .map(|volume| {
            let mounted = fs::metadata(&volume)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            trace!(?volume, ?mounted, "Found camera volume");
            (mounted, volume)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, volume)| volume.join(CAMERA_ROOT));

    debug!(?latest, "Auto-detected camera volume");
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    #[test]
    fn test_latest_volume_picks_newest_card() {
        let root = tempfile::tempdir().unwrap();
        let older = root.path().join("GOPRO_A");
        let newer = root.path().join("GOPRO_B");
        let not_a_card = root.path().join("BACKUP");

        fs::create_dir_all(older.join(CAMERA_ROOT)).unwrap();
        fs::create_dir_all(newer.join(CAMERA_ROOT)).unwrap();
        fs::create_dir_all(&not_a_card).unwrap();

        filetime::set_file_mtime(&older, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
        filetime::set_file_mtime(&newer, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        filetime::set_file_mtime(&not_a_card, FileTime::from_unix_time(1_800_000_000, 0))
            .unwrap();

        let found = latest_volume(&[root.path().to_path_buf()]).unwrap();
        assert_eq!(found, newer.join(CAMERA_ROOT));
    }

    #[test]
    fn test_no_volume() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("EMPTY")).unwrap();
        assert_eq!(latest_volume(&[root.path().to_path_buf()]), None);
        assert_eq!(latest_volume(&[root.path().join("missing")]), None);
    }
}
