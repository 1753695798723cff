//! Atomic file transfers into the project
//!
//! Data is written to a hidden `.<name>.partial` file next to the
//! destination and renamed into place once complete, so a reader never sees
//! a half-written file under its final name.

use crate::config::{ConflictPolicy, FileOperation};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Outcome of a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// File was copied or moved
    Transferred,
    /// Destination existed and was kept
    AlreadyPresent,
    /// Dry run, nothing was touched
    Planned,
}

/// Whether a destination should be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationAction {
    Write,
    Keep,
}

/// Apply the conflict policy to a destination path
pub fn resolve_conflict(dest: &Path, policy: ConflictPolicy) -> Result<DestinationAction> {
    if fs::symlink_metadata(dest).is_err() {
        return Ok(DestinationAction::Write);
    }

    match policy {
        ConflictPolicy::Skip => {
            debug!(?dest, "Destination exists, keeping it");
            Ok(DestinationAction::Keep)
        }
        ConflictPolicy::Overwrite => {
            debug!(?dest, "Destination exists, overwriting");
            Ok(DestinationAction::Write)
        }
        ConflictPolicy::Fail => Err(Error::DestinationExists {
            path: dest.to_path_buf(),
        }),
    }
}

/// Copy or move `source` to `dest`
pub fn transfer(
    source: &Path,
    dest: &Path,
    operation: FileOperation,
    policy: ConflictPolicy,
    dry_run: bool,
) -> Result<TransferOutcome> {
    if resolve_conflict(dest, policy)? == DestinationAction::Keep {
        return Ok(TransferOutcome::AlreadyPresent);
    }

    if dry_run {
        return Ok(TransferOutcome::Planned);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mtime = fs::metadata(source).and_then(|m| m.modified()).ok();

    match operation {
        FileOperation::Copy => {
            write_atomically(dest, |partial| copy_file(source, partial))?;
        }
        FileOperation::Move => {
            // Same filesystem: a rename is already atomic
            if let Err(e) = fs::rename(source, dest) {
                trace!(?source, error = %e, "Rename failed, falling back to copy and delete");
                write_atomically(dest, |partial| copy_file(source, partial))?;
                fs::remove_file(source)?;
            }
        }
    }

    // Preserve modification time
    if let Some(mtime) = mtime {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    Ok(TransferOutcome::Transferred)
}

/// Hidden sibling path used while `dest` is being written
pub fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.partial", name))
}

/// Produce `dest` through a partial file that is renamed into place on success
pub fn write_atomically<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let partial = partial_path(dest);

    if let Err(e) = write(&partial) {
        if partial.exists()
            && let Err(cleanup) = fs::remove_file(&partial)
        {
            warn!(?partial, error = %cleanup, "Failed to remove partial file");
        }
        return Err(e);
    }

    fs::rename(&partial, dest)?;
    Ok(())
}

/// Copy file with buffered I/O
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("GOPR0042.JPG");
        fs::write(&source, b"photo").unwrap();
        let dest = dir.path().join("photos").join("GOPR0042.JPG");
        (dir, source, dest)
    }

    #[test]
    fn test_copy_leaves_source() {
        let (_dir, source, dest) = setup();
        let outcome = transfer(
            &source,
            &dest,
            FileOperation::Copy,
            ConflictPolicy::Skip,
            false,
        )
        .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred);
        assert_eq!(fs::read(&dest).unwrap(), b"photo");
        assert!(source.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_move_removes_source() {
        let (_dir, source, dest) = setup();
        transfer(
            &source,
            &dest,
            FileOperation::Move,
            ConflictPolicy::Skip,
            false,
        )
        .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"photo");
        assert!(!source.exists());
    }

    #[test]
    fn test_conflict_policies() {
        let (_dir, source, dest) = setup();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"older").unwrap();

        let outcome = transfer(
            &source,
            &dest,
            FileOperation::Move,
            ConflictPolicy::Skip,
            false,
        )
        .unwrap();
        assert_eq!(outcome, TransferOutcome::AlreadyPresent);
        assert_eq!(fs::read(&dest).unwrap(), b"older");
        assert!(source.exists(), "skipped move must keep the source");

        let err = transfer(
            &source,
            &dest,
            FileOperation::Copy,
            ConflictPolicy::Fail,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DestinationExists { .. }));

        let outcome = transfer(
            &source,
            &dest,
            FileOperation::Copy,
            ConflictPolicy::Overwrite,
            false,
        )
        .unwrap();
        assert_eq!(outcome, TransferOutcome::Transferred);
        assert_eq!(fs::read(&dest).unwrap(), b"photo");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (_dir, source, dest) = setup();
        let outcome = transfer(
            &source,
            &dest,
            FileOperation::Move,
            ConflictPolicy::Skip,
            true,
        )
        .unwrap();

        assert_eq!(outcome, TransferOutcome::Planned);
        assert!(source.exists());
        assert!(!dest.exists());
        assert!(!dest.parent().unwrap().exists());
    }

    #[test]
    fn test_failed_write_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("G0042_01_L.MOV");

        let result = write_atomically(&dest, |partial| {
            fs::write(partial, b"half")?;
            Err(Error::Validation("interrupted".into()))
        });

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let partial = partial_path(Path::new("/p/sources/videos/G0042_01_H.MP4"));
        assert_eq!(
            partial,
            PathBuf::from("/p/sources/videos/.G0042_01_H.MP4.partial")
        );
    }
}
