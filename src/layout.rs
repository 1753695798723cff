//! Project directory structure

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directories of an editing project rooted at the import destination
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Proxies and their fingerprint aliases
    pub fn proxy_dir(&self) -> PathBuf {
        self.root.join("proxy")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join("sources").join("photos")
    }

    /// Renamed full-resolution videos
    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("sources").join("videos")
    }

    /// Output folder of the editing application, created for it up front
    pub fn render_dir(&self) -> PathBuf {
        self.root.join("render")
    }

    pub fn directories(&self) -> [PathBuf; 4] {
        [
            self.proxy_dir(),
            self.photos_dir(),
            self.videos_dir(),
            self.render_dir(),
        ]
    }

    /// Create every project directory that does not exist yet
    pub fn ensure(&self) -> Result<()> {
        for dir in self.directories() {
            if !dir.is_dir() {
                debug!(?dir, "Creating project directory");
            }
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path().join("project"));
        layout.ensure().unwrap();

        for sub in ["proxy", "sources/photos", "sources/videos", "render"] {
            assert!(dir.path().join("project").join(sub).is_dir(), "{sub} missing");
        }

        // Second call is a no-op
        layout.ensure().unwrap();
    }
}
