//! Container remuxing via FFmpeg
//!
//! Low-resolution camera videos are stream-copied into a container the
//! editing application accepts as a proxy. No re-encoding takes place.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Converts a video into another container without re-encoding
pub trait Remuxer: Send + Sync {
    /// Fail with [`Error::RemuxerNotFound`] when the tool cannot run
    fn ensure_available(&self) -> Result<()>;

    /// Write `source` into `dest` using the given container format
    fn remux(&self, source: &Path, dest: &Path, format: &str) -> Result<()>;
}

/// [`Remuxer`] backed by the `ffmpeg` command line tool
#[derive(Debug)]
pub struct FfmpegRemuxer {
    program: PathBuf,
    available: OnceLock<bool>,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            available: OnceLock::new(),
        }
    }

    /// Check if the program runs (cached)
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            Command::new(&self.program)
                .arg("-version")
                .stdin(Stdio::null())
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        })
    }
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Remuxer for FfmpegRemuxer {
    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::RemuxerNotFound {
                program: self.program.display().to_string(),
            })
        }
    }

    fn remux(&self, source: &Path, dest: &Path, format: &str) -> Result<()> {
        self.ensure_available()?;

        debug!(?source, ?dest, format, "Remuxing");

        // -nostdin and a null stdin: ffmpeg must never wait for input
        let output = Command::new(&self.program)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(source)
            .args(["-c", "copy", "-f", format])
            .arg(dest)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Remux {
                path: source.to_path_buf(),
                message: format!("Failed to execute {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::Remux {
                path: source.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        trace!(?dest, "Remux finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let remuxer = FfmpegRemuxer::new("/nonexistent/bin/ffmpeg-missing");
        let err = remuxer.ensure_available().unwrap_err();
        assert!(matches!(err, Error::RemuxerNotFound { .. }));
        assert_eq!(err.exit_code(), 255);

        let dir = tempfile::tempdir().unwrap();
        let err = remuxer
            .remux(
                &dir.path().join("GL010042.LRV"),
                &dir.path().join("G0042_01_L.MOV"),
                "mov",
            )
            .unwrap_err();
        assert!(matches!(err, Error::RemuxerNotFound { .. }));
    }
}
