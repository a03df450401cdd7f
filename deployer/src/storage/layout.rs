//! Filesystem layout of a deployment run

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::settings::PathSettings;

/// Name of the staging tree under the scratch root
const STAGING_DIR_NAME: &str = "codedeploy";

/// Prefix of the per-invocation packaging directories
pub const PACKAGING_DIR_PREFIX: &str = "app_zip";

/// Storage layout for the trigger
#[derive(Debug, Clone)]
pub struct StorageLayout {
    environment_dir: PathBuf,
    descriptor_dir: PathBuf,
    scratch_root: PathBuf,
    application_dir: String,
    artifact_file: String,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(paths: &PathSettings) -> Self {
        Self {
            environment_dir: paths.environment_dir.clone(),
            descriptor_dir: paths.descriptor_dir.clone(),
            scratch_root: paths.scratch_root.clone(),
            application_dir: paths.application_dir.clone(),
            artifact_file: paths.artifact_file.clone(),
        }
    }

    /// Directory of environment settings profiles
    pub fn environment_dir(&self) -> Dir {
        Dir::new(&self.environment_dir)
    }

    /// Source deployment descriptor tree
    pub fn descriptor_dir(&self) -> Dir {
        Dir::new(&self.descriptor_dir)
    }

    /// Root for scratch directories
    pub fn scratch_root(&self) -> Dir {
        Dir::new(&self.scratch_root)
    }

    /// Shared staging tree, wiped and recopied on every run
    pub fn staging_dir(&self) -> Dir {
        self.scratch_root().subdir(STAGING_DIR_NAME)
    }

    /// Application directory inside the staging tree
    pub fn application_dir(&self) -> Dir {
        self.staging_dir().subdir(&self.application_dir)
    }

    /// Target of the artifact download
    pub fn artifact_file(&self) -> File {
        File::new(self.application_dir().path().join(&self.artifact_file))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(&PathSettings::default())
    }
}
