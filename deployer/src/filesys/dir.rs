//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), DeployError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Replace this directory with a recursive copy of `src`.
    ///
    /// Whatever was here before is removed first. Returns the number of files copied.
    pub async fn replace_with_copy_of(&self, src: &Dir) -> Result<usize, DeployError> {
        self.delete().await?;
        let from = src.path.clone();
        let to = self.path.clone();
        let copied = spawn_blocking(move || copy_tree(&from, &to))
            .await
            .map_err(|e| DeployError::Internal(e.to_string()))??;
        debug!(
            "Copied {} files from {} to {}",
            copied,
            src.path.display(),
            self.path.display()
        );
        Ok(copied)
    }

    /// Create a uniquely named directory under this one, removed when the guard drops
    pub fn create_scratch(&self, prefix: &str) -> Result<ScratchDir, DeployError> {
        std::fs::create_dir_all(&self.path)?;
        let inner = tempfile::Builder::new().prefix(prefix).tempdir_in(&self.path)?;
        Ok(ScratchDir { inner })
    }
}

/// Per-invocation scratch directory. Removed on drop, on every exit path.
#[derive(Debug)]
pub struct ScratchDir {
    inner: tempfile::TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn file(&self, name: &str) -> File {
        File::new(self.inner.path().join(name))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        debug!("Cleaning scratch directory {}", self.inner.path().display());
    }
}

/// All files below `root`, depth first, in a stable order
pub fn walk_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<_> = std::fs::read_dir(root)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(walk_files(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            // fs::copy carries the permission bits along
            std::fs::copy(&from, &to)?;
            copied += 1;
        }
    }

    Ok(copied)
}
