//! Proxy matching and linking
//!
//! A low-resolution file `GL010042.LRV` belongs to the full-resolution
//! `GH010042.MP4` or `GX010042.MP4`. After import the master lives at
//! `sources/videos/G0042_01_H.MP4` (or `_X`), and the proxy is exposed to the
//! editing application as `proxy/<fingerprint of master>.<ext>`.

use crate::config::ConflictPolicy;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::identifier::{MediaIdentifier, VideoKind};
use crate::transfer::{DestinationAction, resolve_conflict};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Full-resolution video already relocated into the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullResVideoRecord {
    pub identifier: MediaIdentifier,
    pub path: PathBuf,
}

/// Full-resolution kinds, in lookup order
const MASTER_KINDS: [VideoKind; 2] = [VideoKind::H, VideoKind::X];

/// Find the relocated master of a proxy source in `videos_dir`
///
/// Returns `None` when this batch has no matching master; that is an
/// expected outcome and callers skip the proxy.
pub fn find_counterpart(
    proxy_source: &MediaIdentifier,
    videos_dir: &Path,
    full_res_extension: &str,
) -> Option<FullResVideoRecord> {
    MASTER_KINDS
        .iter()
        .filter(|kind| **kind != proxy_source.kind)
        .map(|kind| proxy_source.with_kind(*kind))
        .find_map(|identifier| {
            let path = videos_dir.join(identifier.file_name(full_res_extension));
            trace!(?path, "Looking for full-resolution counterpart");
            path.is_file().then_some(FullResVideoRecord { identifier, path })
        })
}

/// Outcome of linking a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    /// An alias with this name exists and was kept
    AlreadyPresent,
    Planned,
}

/// Path of the fingerprint alias for a proxy file
pub fn alias_path(fingerprint: &Fingerprint, proxy_file: &Path, extension: &str) -> PathBuf {
    proxy_file.with_file_name(fingerprint.file_name(extension))
}

/// Create `<fingerprint>.<ext>` next to `proxy_file`, pointing at it
///
/// The link target is the bare file name so the project folder can be
/// moved as a whole.
pub fn link_proxy(
    fingerprint: &Fingerprint,
    proxy_file: &Path,
    extension: &str,
    policy: ConflictPolicy,
    dry_run: bool,
) -> Result<LinkOutcome> {
    let alias = alias_path(fingerprint, proxy_file, extension);
    let target = proxy_file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| proxy_file.to_path_buf());

    if let Ok(existing) = fs::read_link(&alias)
        && existing == target
    {
        debug!(?alias, "Proxy alias already in place");
        return Ok(LinkOutcome::AlreadyPresent);
    }

    let replace = match resolve_conflict(&alias, policy)? {
        DestinationAction::Keep => return Ok(LinkOutcome::AlreadyPresent),
        DestinationAction::Write => fs::symlink_metadata(&alias).is_ok(),
    };

    if dry_run {
        return Ok(LinkOutcome::Planned);
    }

    if replace {
        fs::remove_file(&alias)?;
    }

    create_symlink(&target, &alias)?;
    debug!(?alias, ?target, "Linked proxy");
    Ok(LinkOutcome::Created)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    // Requires developer mode or elevated privileges
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fingerprint::fingerprint;

    fn touch(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("G0042_02_H.MP4"), b"other chapter");
        touch(&dir.path().join("G0043_01_H.MP4"), b"other recording");
        touch(&dir.path().join("G0042_01_L.MP4"), b"same kind");

        let proxy = MediaIdentifier::parse("GL010042.LRV").unwrap();
        assert_eq!(find_counterpart(&proxy, dir.path(), "MP4"), None);

        // Missing directory is just "not found"
        assert_eq!(
            find_counterpart(&proxy, &dir.path().join("missing"), "MP4"),
            None
        );
    }

    #[test]
    fn test_finds_master_of_any_kind() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("G0042_01_H.MP4"), b"avc");
        touch(&dir.path().join("G0050_03_X.MP4"), b"hevc");

        let proxy = MediaIdentifier::parse("GL010042.LRV").unwrap();
        let record = find_counterpart(&proxy, dir.path(), "MP4").unwrap();
        assert_eq!(record.path, dir.path().join("G0042_01_H.MP4"));
        assert_eq!(record.identifier.kind, VideoKind::H);

        let proxy = MediaIdentifier::parse("GL030050.LRV").unwrap();
        let record = find_counterpart(&proxy, dir.path(), "MP4").unwrap();
        assert_eq!(record.path, dir.path().join("G0050_03_X.MP4"));
        assert_eq!(record.identifier.base_name(), proxy.base_name());
    }

    #[test]
    fn test_directory_with_master_name_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("G0042_01_H.MP4")).unwrap();

        let proxy = MediaIdentifier::parse("GL010042.LRV").unwrap();
        assert_eq!(find_counterpart(&proxy, dir.path(), "MP4"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_proxy() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("G0042_01_H.MP4");
        touch(&master, b"master");
        let proxy_file = dir.path().join("proxy").join("G0042_01_L.MOV");
        touch(&proxy_file, b"proxy");

        let fp = fingerprint(&master).unwrap();
        let outcome = link_proxy(&fp, &proxy_file, "MOV", ConflictPolicy::Fail, false).unwrap();
        assert_eq!(outcome, LinkOutcome::Created);

        let alias = alias_path(&fp, &proxy_file, "MOV");
        assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("G0042_01_L.MOV"));
        assert_eq!(fs::read(&alias).unwrap(), b"proxy");

        // Same link again is fine even under the fail policy
        let outcome = link_proxy(&fp, &proxy_file, "MOV", ConflictPolicy::Fail, false).unwrap();
        assert_eq!(outcome, LinkOutcome::AlreadyPresent);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("G0042_01_H.MP4");
        touch(&master, b"master");
        let proxy_file = dir.path().join("G0042_01_L.MOV");
        touch(&proxy_file, b"proxy");

        let fp = fingerprint(&master).unwrap();
        let alias = alias_path(&fp, &proxy_file, "MOV");
        std::os::unix::fs::symlink("G0007_01_L.MOV", &alias).unwrap();

        let outcome = link_proxy(&fp, &proxy_file, "MOV", ConflictPolicy::Skip, false).unwrap();
        assert_eq!(outcome, LinkOutcome::AlreadyPresent);
        assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("G0007_01_L.MOV"));

        let err = link_proxy(&fp, &proxy_file, "MOV", ConflictPolicy::Fail, false).unwrap_err();
        assert!(matches!(err, Error::DestinationExists { .. }));

        let outcome =
            link_proxy(&fp, &proxy_file, "MOV", ConflictPolicy::Overwrite, false).unwrap();
        assert_eq!(outcome, LinkOutcome::Created);
        assert_eq!(fs::read_link(&alias).unwrap(), PathBuf::from("G0042_01_L.MOV"));
    }
}
